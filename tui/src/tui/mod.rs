use auction_client::scroll::visibility_ratio;

/// Selection and scroll position of the card list. The footer marker sits on
/// the row after the last card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListCursor {
    pub selected: usize,
    pub offset: usize,
}

impl ListCursor {
    pub fn down(&mut self, cards: usize) {
        if cards > 0 {
            self.selected = (self.selected + 1).min(cards - 1);
        }
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adjusts the offset so the selection is on screen. On the last card the
    /// footer row is pulled into view as well.
    pub fn scroll_into_view(&mut self, cards: usize, viewport: usize) {
        if viewport == 0 {
            return;
        }
        self.selected = self.selected.min(cards.saturating_sub(1));
        let focus = if cards == 0 || self.selected + 1 == cards {
            cards
        } else {
            self.selected
        };
        if self.selected < self.offset {
            self.offset = self.selected;
        }
        if focus >= self.offset + viewport {
            self.offset = focus + 1 - viewport;
        }
    }

    pub fn marker_ratio(&self, cards: usize, viewport: usize) -> f32 {
        visibility_ratio(cards, 1, self.offset, viewport)
    }
}
