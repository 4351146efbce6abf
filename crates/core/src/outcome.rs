/// Result of one extractor call as seen by the engine: either the real
/// summary, or the neutral default together with the reason it was used.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Outcome::Ready(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            Outcome::Ready(value) => (value, None),
            Outcome::Degraded { value, reason } => (value, Some(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_keeps_value_and_reason() {
        let outcome = Outcome::Degraded {
            value: 3,
            reason: "timed out".to_string(),
        };
        assert!(outcome.is_degraded());
        assert_eq!(*outcome.value(), 3);
        assert_eq!(outcome.into_parts(), (3, Some("timed out".to_string())));
    }
}
