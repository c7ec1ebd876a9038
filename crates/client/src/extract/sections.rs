//! Lesson sections, located through one table instead of per-section types.

use scraper::{Html, Selector};
use serde::Serialize;

use super::delink::{DelinkOptions, delink_inner, delink_outer};

/// The nine section identifiers a lesson page may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Introduction,
    GuidingQuestions,
    LearningObjectives,
    Background,
    PreparationInstructions,
    LessonActivities,
    Assessment,
    ExtendingTheLesson,
    TheBasics,
}

impl SectionId {
    /// Menu key of the section (also the stem of its part file).
    pub fn key(self) -> &'static str {
        match self {
            SectionId::Introduction => "introduction",
            SectionId::GuidingQuestions => "guiding_questions",
            SectionId::LearningObjectives => "learning_objectives",
            SectionId::Background => "background",
            SectionId::PreparationInstructions => "preparation_instructions",
            SectionId::LessonActivities => "lesson_activities",
            SectionId::Assessment => "assessment",
            SectionId::ExtendingTheLesson => "extending_the_lesson",
            SectionId::TheBasics => "the_basics",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        SECTION_TABLE.iter().map(|spec| spec.id).find(|id| id.key() == key)
    }
}

/// Which part of a section container becomes the section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// Inner markup of the container's `div.text` block.
    TextBlock,
    /// The whole container, tag included.
    WholeContainer,
}

struct SectionSpec {
    id: SectionId,
    locator: &'static str,
    selection: Selection,
}

/// Section id -> (structural locator, selection strategy), in page order.
const SECTION_TABLE: &[SectionSpec] = &[
    SectionSpec { id: SectionId::Introduction, locator: "div#sect-introduction", selection: Selection::TextBlock },
    SectionSpec { id: SectionId::GuidingQuestions, locator: "div#sect-questions", selection: Selection::TextBlock },
    SectionSpec { id: SectionId::LearningObjectives, locator: "div#sect-objectives", selection: Selection::TextBlock },
    SectionSpec { id: SectionId::Background, locator: "div#sect-background", selection: Selection::TextBlock },
    SectionSpec {
        id: SectionId::PreparationInstructions,
        locator: "div#sect-preparation",
        selection: Selection::TextBlock,
    },
    SectionSpec { id: SectionId::LessonActivities, locator: "div#sect-activities", selection: Selection::TextBlock },
    SectionSpec { id: SectionId::Assessment, locator: "div#sect-assessment", selection: Selection::TextBlock },
    SectionSpec { id: SectionId::ExtendingTheLesson, locator: "div#sect-extending", selection: Selection::TextBlock },
    SectionSpec { id: SectionId::TheBasics, locator: "div#sect-thebasics", selection: Selection::WholeContainer },
];

/// One extracted section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    /// De-linked `<h4>` heading markup, when the container has one.
    pub title: Option<String>,
    /// De-linked body markup.
    pub body_html: String,
}

impl Section {
    /// Standalone document written to the section's part file.
    pub fn to_document(&self) -> String {
        let heading = match self.id {
            // the whole container already carries its heading
            SectionId::TheBasics => "",
            _ => self.title.as_deref().unwrap_or_default(),
        };
        format!(
            "<html><head><meta charset=\"UTF-8\"></head><body>{}{}</body></html>",
            heading, self.body_html
        )
    }
}

/// Extract every section present on the page, in table order.
///
/// Sections whose container is missing are simply absent from the result.
pub fn extract_sections(document: &Html) -> Vec<Section> {
    let heading = Selector::parse("h4").expect("invalid selector");
    let text_block = Selector::parse("div.text").expect("invalid selector");

    let mut sections = Vec::new();
    for spec in SECTION_TABLE {
        let locator = Selector::parse(spec.locator).expect("invalid selector");
        let Some(container) = document.select(&locator).next() else {
            tracing::debug!(section = spec.id.key(), "section container absent");
            continue;
        };

        let title = container
            .select(&heading)
            .next()
            .map(|h| delink_outer(h, DelinkOptions::default()).html);

        let body_html = match spec.selection {
            Selection::WholeContainer => delink_outer(container, DelinkOptions::default()).html,
            Selection::TextBlock => container
                .select(&text_block)
                .next()
                .map(|block| delink_inner(block, DelinkOptions::default()).html)
                .unwrap_or_default(),
        };

        sections.push(Section { id: spec.id, title, body_html });
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <div id="sect-introduction">
                <h4>Introduction</h4>
                <div class="text"><p>Homer's <a href="/iliad">Iliad</a> opens in war.</p></div>
            </div>
            <div id="sect-background">
                <h4>Background</h4>
                <div class="text"><p>Troy.</p></div>
            </div>
            <div id="sect-thebasics">
                <h4>The Basics</h4>
                <dl><dt>Grade</dt><dd><a href="/grade/9">9-12</a></dd></dl>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_absent_sections_are_omitted() {
        let doc = Html::parse_document(PAGE);
        let sections = extract_sections(&doc);
        let ids: Vec<SectionId> = sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SectionId::Introduction, SectionId::Background, SectionId::TheBasics]);
    }

    #[test]
    fn test_text_block_is_delinked() {
        let doc = Html::parse_document(PAGE);
        let intro = extract_sections(&doc).remove(0);
        assert_eq!(intro.title.as_deref(), Some("<h4>Introduction</h4>"));
        assert_eq!(intro.body_html, "<p>Homer's Iliad opens in war.</p>");
    }

    #[test]
    fn test_the_basics_keeps_whole_container() {
        let doc = Html::parse_document(PAGE);
        let basics = extract_sections(&doc).pop().unwrap();
        assert!(basics.body_html.starts_with(r#"<div id="sect-thebasics">"#));
        assert!(basics.body_html.contains("<dd>9-12</dd>"));
        assert!(!basics.body_html.contains("<a "));
        assert_eq!(basics.to_document().matches("<h4>").count(), 1);
    }

    #[test]
    fn test_missing_text_block_yields_empty_body() {
        let doc = Html::parse_document(r#"<div id="sect-assessment"><h4>Assessment</h4></div>"#);
        let sections = extract_sections(&doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body_html, "");
    }

    #[test]
    fn test_section_document() {
        let section = Section {
            id: SectionId::Background,
            title: Some("<h4>Background</h4>".into()),
            body_html: "<p>Troy.</p>".into(),
        };
        assert_eq!(
            section.to_document(),
            "<html><head><meta charset=\"UTF-8\"></head><body><h4>Background</h4><p>Troy.</p></body></html>"
        );
    }

    #[test]
    fn test_keys_round_trip_through_table() {
        for spec in SECTION_TABLE {
            assert_eq!(SectionId::from_key(spec.id.key()), Some(spec.id));
        }
        assert_eq!(SectionId::from_key("vocabulary"), None);
    }
}
