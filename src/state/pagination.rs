//! Paginated-mode load-completion detector

use crate::state::TerminationReason;

/// Whether a paginated listing has more pages to visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    /// The next page index should be fetched
    HasMore,

    /// No further pages will be fetched
    NoMore(TerminationReason),
}

/// Decides when a paginated crawl is finished
///
/// A crawl stops when a fetched page yields zero candidates (`Exhausted`) or
/// when the page just visited is the last one allowed by `max_pages`
/// (`MaxPagesReached`). An empty page always wins over the bound, so a final
/// empty page is reported as `Exhausted`.
#[derive(Debug, Clone)]
pub struct PaginationDetector {
    max_pages: u32,
    state: PaginationState,
}

impl PaginationDetector {
    /// Creates a detector bounded to page indices `1..=max_pages`
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.max(1),
            state: PaginationState::HasMore,
        }
    }

    /// Returns the current state
    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Returns the highest page index that may be fetched
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Records the outcome of a fetched and extracted page
    ///
    /// # Arguments
    ///
    /// * `page_index` - 1-based index of the page just visited
    /// * `candidate_count` - Number of candidates extracted from it
    pub fn observe_page(&mut self, page_index: u32, candidate_count: usize) -> PaginationState {
        if let PaginationState::NoMore(_) = self.state {
            return self.state;
        }

        self.state = if candidate_count == 0 {
            PaginationState::NoMore(TerminationReason::Exhausted)
        } else {
            self.bound_check(page_index)
        };

        self.state
    }

    /// Records a page whose fetch failed
    ///
    /// A failed page says nothing about whether the catalog is exhausted, so
    /// only the page bound can end the crawl here.
    pub fn observe_failed_page(&mut self, page_index: u32) -> PaginationState {
        if let PaginationState::NoMore(_) = self.state {
            return self.state;
        }

        self.state = self.bound_check(page_index);
        self.state
    }

    fn bound_check(&self, page_index: u32) -> PaginationState {
        if page_index >= self.max_pages {
            PaginationState::NoMore(TerminationReason::MaxPagesReached)
        } else {
            PaginationState::HasMore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_more() {
        let detector = PaginationDetector::new(3);
        assert_eq!(detector.state(), PaginationState::HasMore);
    }

    #[test]
    fn test_empty_page_exhausts_immediately() {
        let mut detector = PaginationDetector::new(10);
        assert_eq!(
            detector.observe_page(1, 0),
            PaginationState::NoMore(TerminationReason::Exhausted)
        );
    }

    #[test]
    fn test_page_bound() {
        let mut detector = PaginationDetector::new(2);
        assert_eq!(detector.observe_page(1, 24), PaginationState::HasMore);
        assert_eq!(
            detector.observe_page(2, 24),
            PaginationState::NoMore(TerminationReason::MaxPagesReached)
        );
    }

    #[test]
    fn test_empty_last_page_is_exhausted_not_bounded() {
        let mut detector = PaginationDetector::new(2);
        detector.observe_page(1, 20);
        assert_eq!(
            detector.observe_page(2, 0),
            PaginationState::NoMore(TerminationReason::Exhausted)
        );
    }

    #[test]
    fn test_failed_page_only_stops_at_bound() {
        let mut detector = PaginationDetector::new(3);
        assert_eq!(detector.observe_failed_page(1), PaginationState::HasMore);
        assert_eq!(detector.observe_failed_page(2), PaginationState::HasMore);
        assert_eq!(
            detector.observe_failed_page(3),
            PaginationState::NoMore(TerminationReason::MaxPagesReached)
        );
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let mut detector = PaginationDetector::new(5);
        detector.observe_page(1, 0);
        assert_eq!(
            detector.observe_page(2, 10),
            PaginationState::NoMore(TerminationReason::Exhausted)
        );
    }

    #[test]
    fn test_zero_bound_is_clamped() {
        let mut detector = PaginationDetector::new(0);
        assert_eq!(detector.max_pages(), 1);
        assert_eq!(
            detector.observe_page(1, 5),
            PaginationState::NoMore(TerminationReason::MaxPagesReached)
        );
    }
}
