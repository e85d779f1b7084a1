//! PanelHost collaborator seam: the visual surface the controller drives.

/// The one glyph slot on the panel. There is a single mutable slot rather
/// than two coexisting icon widgets; whoever implements the surface swaps
/// the slot's content in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Play,
    Stop,
}

impl Glyph {
    pub fn symbol(self) -> &'static str {
        match self {
            Glyph::Play => "▶",
            Glyph::Stop => "■",
        }
    }
}

/// Panel surface: glyph slot, the toggle item's label, the URL item's label,
/// and a notification call. Implementations must apply updates immediately —
/// the controller relies on the surface matching the state within the same
/// event-loop turn as the transition.
pub trait PanelHost {
    fn set_glyph(&mut self, glyph: Glyph);
    fn set_toggle_label(&mut self, label: &str);
    fn set_url_label(&mut self, url: &str);
    fn notify(&mut self, title: &str, body: &str);
}
