//! Popover content rendering

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::PresenterConfig;
use crate::glossary::{truncate, Term};

/// Render the definition card shown in a term's popover.
///
/// Every catalog field is escaped. Acronym, sense and source are optional
/// and simply omitted when absent.
pub fn render_definition(term: &Term, config: &PresenterConfig) -> String {
    let mut html = String::with_capacity(256 + term.definition.len());

    html.push_str("<div class=\"geau__header\"><h4>");
    html.push_str(&encode_text(&term.label));
    if let Some(acronym) = &term.acronym {
        html.push_str(" (");
        html.push_str(&encode_text(acronym));
        html.push(')');
    }
    html.push_str("</h4>");
    if let Some(sense) = &term.sense_number {
        html.push_str("<h6>Sens ");
        html.push_str(&encode_text(sense));
        html.push_str("</h6>");
    }
    html.push_str("</div>");

    html.push_str("<p class=\"geau__definition\">");
    html.push_str(&encode_text(&truncate(&term.definition, config.definition_budget)));
    html.push_str("</p>");

    if let Some(source) = &term.source {
        html.push_str("<p class=\"geau__source\"><u>Source</u> : ");
        html.push_str(&encode_text(source));
        html.push_str("</p>");
    }

    let href = format!("{}{}", config.link_base, term.id);
    html.push_str("<p class=\"geau__link\"><a target=\"_blank\" rel=\"noopener\" href=\"");
    html.push_str(&encode_double_quoted_attribute(&href));
    html.push_str("\">En savoir plus</a></p>");

    html
}
