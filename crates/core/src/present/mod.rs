//! Markup the overlay adds to a portfolio page.

pub mod inject;
pub mod locale;
pub mod modal;
pub mod summary;

pub use inject::{inject, Overlay};
pub use modal::{render_modal, HistoryModal, ModalEvent, WindowCards};
pub use summary::{render_summary, summarize, SummaryFigures};
