//! Markup extraction for lesson and student resource pages.
//!
//! ### Lesson pages
//! - Nine sections located through one table (`sections`), each de-linked.
//! - A menu of the present sections plus "The Basics" (`menu`).
//! - The resource panel: hero image, PDFs, student resource links (`panel`).
//!
//! ### Student resource pages
//! - Summary card, image credits and the "view more" link (`student`).
//!
//! Missing nodes never fail extraction; they yield absent or empty values.

pub mod delink;
pub mod lesson;
pub mod menu;
pub mod panel;
pub mod sections;
pub mod student;

pub use delink::{DelinkOptions, Delinked, delink_fragment, delink_inner, delink_outer};
pub use lesson::{LessonPage, clean_title};
pub use menu::{Menu, MenuEntry, THE_BASICS};
pub use panel::{HeroImage, PdfLink, ResourcePanel, has_copyright, text_has_copyright};
pub use sections::{Section, SectionId, extract_sections};
pub use student::StudentResourcePage;
