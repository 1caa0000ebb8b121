//! Mutation id validation against the ledger.
//!
//! The ledger hands out the next id by atomic increment; the request's id
//! must equal that value for the mutation to run.

/// Result of checking a request's mutation id against the freshly
/// incremented ledger value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceValidationResult {
    /// The request is the next mutation for this client.
    Valid,
    /// The request was applied before. `last_applied` is the ledger value
    /// prior to this attempt's increment.
    AlreadyProcessed { last_applied: i64 },
    /// The request skips ahead; `expected` is the id the ledger wanted.
    OutOfOrder { expected: i64 },
}

/// Compares the request's mutation id with the incremented ledger value.
///
/// # Arguments
/// * `received` - The `id` carried by the mutation request
/// * `next` - The value returned by the ledger's fetch-and-increment
pub fn validate_mutation_id(received: i64, next: i64) -> SequenceValidationResult {
    use std::cmp::Ordering;

    match received.cmp(&next) {
        Ordering::Equal => SequenceValidationResult::Valid,
        Ordering::Less => SequenceValidationResult::AlreadyProcessed {
            last_applied: next - 1,
        },
        Ordering::Greater => SequenceValidationResult::OutOfOrder { expected: next },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_next_id() {
        assert_eq!(validate_mutation_id(6, 6), SequenceValidationResult::Valid);
    }

    #[test]
    fn test_validate_first_mutation() {
        assert_eq!(validate_mutation_id(1, 1), SequenceValidationResult::Valid);
    }

    #[test]
    fn test_validate_one_behind_is_already_processed() {
        assert_eq!(
            validate_mutation_id(5, 6),
            SequenceValidationResult::AlreadyProcessed { last_applied: 5 }
        );
    }

    #[test]
    fn test_validate_far_behind_is_already_processed() {
        assert_eq!(
            validate_mutation_id(3, 6),
            SequenceValidationResult::AlreadyProcessed { last_applied: 5 }
        );
    }

    #[test]
    fn test_validate_one_ahead_is_out_of_order() {
        assert_eq!(
            validate_mutation_id(7, 6),
            SequenceValidationResult::OutOfOrder { expected: 6 }
        );
    }

    #[test]
    fn test_validate_zero_id_is_already_processed() {
        assert_eq!(
            validate_mutation_id(0, 1),
            SequenceValidationResult::AlreadyProcessed { last_applied: 0 }
        );
    }
}
