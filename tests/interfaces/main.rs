//! Interface tests for the push protocol using Cucumber.
//!
//! These scenarios describe the client-visible behavior of a push: which
//! mutations are applied, skipped or rejected, and how the ledger moves.
//!
//! ```bash
//! cargo test --test interfaces
//! ```

mod steps;

use cucumber::World;
use steps::push::PushWorld;

#[tokio::main]
async fn main() {
    pushgate::utils::bootstrap::try_init_tracing();

    println!("\n=== Running Push Interface Tests ===\n");
    PushWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/push.feature")
        .await;

    println!("\n=== Running Manual Transaction Interface Tests ===\n");
    PushWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/manual_transactions.feature")
        .await;
}
