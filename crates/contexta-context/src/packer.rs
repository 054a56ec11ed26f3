use crate::message::ContextMessage;

/// Tokens reserved for priming the model's reply
pub const REPLY_PRIMING_TOKENS: usize = 3;

/// Anything with a known token cost
pub trait TokenWeighted {
    fn token_count(&self) -> usize;
}

impl TokenWeighted for ContextMessage {
    fn token_count(&self) -> usize {
        self.token_count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackedContext<T> {
    /// Included suffix, chronological
    pub context: Vec<T>,
    pub remaining_tokens: usize,
    /// Excluded prefix, chronological
    pub messages_to_refine: Vec<T>,
    /// Index of the newest excluded message, if any was excluded
    pub boundary_index: Option<usize>,
}

/// Greedily keep the newest messages that fit in `max_context_tokens`.
///
/// Walks newest to oldest from a running total of [`REPLY_PRIMING_TOKENS`]
/// and stops at the first message that would overflow. Nothing older than
/// that message is ever included, even if it would fit. The caller's slice
/// is not touched.
pub fn pack_context<T>(ordered: &[T], max_context_tokens: usize) -> PackedContext<T>
where
    T: TokenWeighted + Clone,
{
    let mut pending: Vec<T> = ordered.to_vec();
    let mut context: Vec<T> = Vec::with_capacity(pending.len());
    let mut running_total = REPLY_PRIMING_TOKENS;

    while let Some(candidate) = pending.pop() {
        let cost = candidate.token_count();
        if running_total + cost > max_context_tokens {
            pending.push(candidate);
            break;
        }
        running_total += cost;
        context.push(candidate);
    }

    context.reverse();
    let boundary_index = pending.len().checked_sub(1);

    tracing::debug!(
        included = context.len(),
        excluded = pending.len(),
        running_total,
        max_context_tokens,
        "packed context"
    );

    PackedContext {
        context,
        remaining_tokens: max_context_tokens.saturating_sub(running_total),
        messages_to_refine: pending,
        boundary_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl TokenWeighted for usize {
        fn token_count(&self) -> usize {
            *self
        }
    }

    #[test]
    fn test_worked_example() {
        let packed = pack_context(&[20usize, 15, 10, 8, 5], 40);
        assert_eq!(packed.context, vec![10, 8, 5]);
        assert_eq!(packed.messages_to_refine, vec![20, 15]);
        assert_eq!(packed.boundary_index, Some(1));
        assert_eq!(packed.remaining_tokens, 14);
    }

    #[test]
    fn test_everything_fits() {
        let packed = pack_context(&[1usize, 2, 3], 100);
        assert_eq!(packed.context, vec![1, 2, 3]);
        assert!(packed.messages_to_refine.is_empty());
        assert_eq!(packed.boundary_index, None);
        assert_eq!(packed.remaining_tokens, 100 - 3 - 6);
    }

    #[test]
    fn test_exact_fit_is_included() {
        let packed = pack_context(&[7usize], 10);
        assert_eq!(packed.context, vec![7]);
        assert_eq!(packed.remaining_tokens, 0);
    }

    #[test]
    fn test_never_backtracks() {
        // 30 overflows; the older 1 would fit but must not be taken
        let packed = pack_context(&[1usize, 30, 5], 20);
        assert_eq!(packed.context, vec![5]);
        assert_eq!(packed.messages_to_refine, vec![1, 30]);
    }

    #[test]
    fn test_latest_too_large() {
        let packed = pack_context(&[1usize, 2, 50], 20);
        assert!(packed.context.is_empty());
        assert_eq!(packed.messages_to_refine, vec![1, 2, 50]);
        assert_eq!(packed.boundary_index, Some(2));
        assert_eq!(packed.remaining_tokens, 17);
    }

    #[test]
    fn test_budget_below_priming() {
        let packed = pack_context(&[0usize, 1], 2);
        assert!(packed.context.is_empty());
        assert_eq!(packed.remaining_tokens, 0);
    }

    #[test]
    fn test_empty_input() {
        let packed = pack_context::<usize>(&[], 10);
        assert!(packed.context.is_empty());
        assert_eq!(packed.boundary_index, None);
        assert_eq!(packed.remaining_tokens, 7);
    }

    #[test]
    fn test_budget_invariant_over_many_shapes() {
        let shapes: Vec<Vec<usize>> = vec![
            vec![5, 5, 5, 5],
            vec![100, 1, 1, 1],
            vec![1, 1, 1, 100],
            vec![13, 2, 40, 8, 8, 3],
            vec![0, 0, 0],
        ];
        for shape in shapes {
            for max in [0usize, 3, 10, 25, 60, 200] {
                let packed = pack_context(&shape, max);
                let used: usize = packed.context.iter().sum();
                if !packed.context.is_empty() {
                    assert!(used + REPLY_PRIMING_TOKENS <= max, "{:?} @ {}", shape, max);
                }
                let mut rebuilt = packed.messages_to_refine.clone();
                rebuilt.extend(packed.context.iter().copied());
                assert_eq!(rebuilt, shape);
            }
        }
    }
}
