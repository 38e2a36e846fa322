use ratatui::{
    Frame,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use westat_core::{Controller, DeltaCategory, controller::FieldBinding};

const TITLE_WIDTH: usize = 18;

fn header_style() -> Style {
    Style::default().fg(Color::Red)
}

fn title_style() -> Style {
    Style::default().fg(Color::Cyan)
}

fn value_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn delta_style(category: DeltaCategory) -> Style {
    match category {
        DeltaCategory::Positive => Style::default().fg(Color::Green),
        DeltaCategory::Negative => Style::default().fg(Color::Red),
        DeltaCategory::Equal => Style::default().fg(Color::LightBlue),
    }
}

pub fn draw(frame: &mut Frame, controller: &Controller) {
    frame.render_widget(Paragraph::new(lines(controller)), frame.area());
}

/// Header, one block per section, then the clock and a status line.
pub fn lines(controller: &Controller) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::default(),
        padded(5, Span::styled(controller.header(), header_style())),
        Line::default(),
    ];

    for section in controller.sections() {
        lines.push(Line::default());
        lines.push(padded(10, Span::styled(section.title, header_style())));
        lines.push(Line::default());
        lines.extend(section.bindings.iter().map(field_line));
    }

    lines.push(Line::default());
    lines.push(padded(5, Span::styled(controller.clock(), header_style())));
    lines.push(Line::default());
    lines.push(padded(
        5,
        Span::raw(format!("{} readings stored · q to quit", controller.history_len())),
    ));

    lines
}

fn field_line(binding: &FieldBinding) -> Line<'_> {
    let mut spans = vec![
        Span::raw("  "),
        Span::styled(format!("{:<TITLE_WIDTH$}", binding.title), title_style()),
        Span::styled(binding.text.as_str(), value_style()),
    ];

    if let Some(delta) = binding.delta {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(delta.to_string(), delta_style(delta.category)));
    }

    Line::from(spans)
}

fn padded(width: usize, span: Span<'_>) -> Line<'_> {
    Line::from(vec![Span::raw(" ".repeat(width)), span])
}
