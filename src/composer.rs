use crate::propagation::Injector;
use crate::state::Tracestate;
use crate::{tracestate_debug, tracestate_warn};

/// Maximum byte length of the combined `tracestate` header.
///
/// This is the wire-format budget for the serialized member list; anything
/// longer is evicted from the tail before the header leaves the process.
pub const TRACESTATE_COMBINED_HEADER_MAX_LENGTH: usize = 512;

/// Header name under which the combined tracestate is propagated.
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Composes length-bounded `tracestate` headers for outgoing propagation.
///
/// Given the current member list and the service/span member to prepend,
/// [`combined_header`] produces the serialized header: the new member takes
/// index 0, trailing members are evicted until the result fits the byte
/// budget, and the survivors are joined in wire format. The composition is
/// a pure function of its inputs; a composer can be shared freely across
/// request-handling contexts.
///
/// # Examples
///
/// ```
/// use tracestate_propagator::{Tracestate, TracestateComposer};
///
/// let state = Tracestate::from_key_value(vec![("congo", "t61rcWkgMzE")]).unwrap();
/// let composer = TracestateComposer::new();
///
/// let header = composer.combined_header(&state, "rojo", "00f067aa0ba902b7");
/// assert_eq!(header, "rojo=00f067aa0ba902b7,congo=t61rcWkgMzE");
/// ```
///
/// [`combined_header`]: TracestateComposer::combined_header
#[derive(Clone, Debug)]
pub struct TracestateComposer {
    max_len: usize,
}

impl TracestateComposer {
    /// Creates a composer with the default combined header budget,
    /// [`TRACESTATE_COMBINED_HEADER_MAX_LENGTH`].
    pub fn new() -> Self {
        TracestateComposer {
            max_len: TRACESTATE_COMBINED_HEADER_MAX_LENGTH,
        }
    }

    /// Overrides the combined header byte budget.
    ///
    /// Degenerate budgets are accepted; a budget smaller than the newest
    /// member's own serialized length leaves that single member in place.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// The byte budget this composer enforces.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Builds the combined header for one outgoing propagation event.
    ///
    /// `(key, value)` is prepended to `state` at index 0, trailing members
    /// are evicted until the serialized form fits the budget, and the
    /// remainder is joined as `key1=value1,key2=value2,...`. The input
    /// `state` is not modified.
    ///
    /// When even the newly prepended member alone exceeds the budget it is
    /// returned unchanged rather than dropped or truncated mid-member, so
    /// the newest trace-state entry always survives.
    pub fn combined_header<K, V>(&self, state: &Tracestate, key: K, value: V) -> String
    where
        K: Into<String>,
        V: Into<String>,
    {
        let combined = state.prepend(key, value).evict_to_fit(self.max_len);
        let header = combined.header();

        if header.len() > self.max_len {
            tracestate_warn!(
                name: "tracestate_member_over_budget",
                header_len = header.len(),
                max_len = self.max_len
            );
        }
        tracestate_debug!(
            name: "tracestate_header_composed",
            members = combined.len(),
            header_len = header.len()
        );

        header
    }

    /// Builds the combined header and sets it on the carrier under
    /// [`TRACESTATE_HEADER`].
    pub fn inject<K, V>(&self, state: &Tracestate, key: K, value: V, injector: &mut dyn Injector)
    where
        K: Into<String>,
        V: Into<String>,
    {
        injector.set(TRACESTATE_HEADER, self.combined_header(state, key, value));
    }
}

impl Default for TracestateComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Member;

    #[test]
    fn test_combined_header_from_empty_state() {
        let composer = TracestateComposer::new().with_max_len(128);

        let header = composer.combined_header(&Tracestate::NONE, "svc_a", "c3Bhbklk");
        assert_eq!(header, "svc_a=c3Bhbklk");
    }

    #[test]
    fn test_combined_header_prepends_new_member() {
        let state = Tracestate::from_key_value(vec![("x", "1")]).unwrap();
        let composer = TracestateComposer::new().with_max_len(128);

        let header = composer.combined_header(&state, "y", "2");
        assert_eq!(header, "y=2,x=1");
    }

    #[test]
    fn test_combined_header_evicts_tail_at_exact_boundary() {
        let state =
            Tracestate::from_key_value(vec![("a", "aaaa"), ("b", "bbbb"), ("c", "cccc")]).unwrap();
        let composer = TracestateComposer::new().with_max_len("n=nn,a=aaaa".len());

        let header = composer.combined_header(&state, "n", "nn");
        assert_eq!(header, "n=nn,a=aaaa");
    }

    #[test]
    fn test_combined_header_keeps_oversized_new_member() {
        let composer = TracestateComposer::new().with_max_len(8);

        let header = composer.combined_header(&Tracestate::NONE, "service", "c3Bhbklk");
        assert_eq!(header, "service=c3Bhbklk");
    }

    #[test]
    fn test_combined_header_zero_budget() {
        let state = Tracestate::from_key_value(vec![("x", "1")]).unwrap();
        let composer = TracestateComposer::new().with_max_len(0);

        // Everything but the new member is evicted; the new member survives
        // the impossible budget.
        let header = composer.combined_header(&state, "y", "2");
        assert_eq!(header, "y=2");
    }

    #[test]
    fn test_combined_header_stays_within_default_budget() {
        let state = (0..64)
            .map(|i| Member::new(format!("vendor{i:02}"), "0123456789abcdef"))
            .collect::<Tracestate>();
        let composer = TracestateComposer::new();

        let header = composer.combined_header(&state, "svc_a", "c3Bhbklk");
        assert!(header.len() <= TRACESTATE_COMBINED_HEADER_MAX_LENGTH);
        assert!(header.starts_with("svc_a=c3Bhbklk,vendor00="));
    }

    #[test]
    fn test_combined_header_does_not_mutate_input() {
        let state = Tracestate::from_key_value(vec![("x", "1")]).unwrap();
        let composer = TracestateComposer::new().with_max_len(3);

        let _ = composer.combined_header(&state, "y", "2");
        assert_eq!(state.header(), "x=1");
    }

    #[test]
    fn test_inject_sets_tracestate_header() {
        use std::collections::HashMap;

        let state = Tracestate::from_key_value(vec![("congo", "t61rcWkgMzE")]).unwrap();
        let composer = TracestateComposer::new();

        let mut carrier: HashMap<String, String> = HashMap::new();
        composer.inject(&state, "rojo", "00f067aa0ba902b7", &mut carrier);

        assert_eq!(
            carrier[TRACESTATE_HEADER],
            "rojo=00f067aa0ba902b7,congo=t61rcWkgMzE"
        );
    }

    #[test]
    fn test_max_len_builder() {
        assert_eq!(
            TracestateComposer::new().max_len(),
            TRACESTATE_COMBINED_HEADER_MAX_LENGTH
        );
        assert_eq!(TracestateComposer::new().with_max_len(64).max_len(), 64);
        assert_eq!(TracestateComposer::default().max_len(), TRACESTATE_COMBINED_HEADER_MAX_LENGTH);
    }
}
