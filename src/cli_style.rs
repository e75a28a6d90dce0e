//! Terminal styling for musicboxd-admin.

use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

const SECTION_WIDTH: usize = 60;

const fn rgb(r: u8, g: u8, b: u8) -> CtColor {
    CtColor::Rgb { r, g, b }
}

const ACCENT: CtColor = rgb(0, 200, 220);
const BULLET: CtColor = rgb(180, 100, 255);
const OK: CtColor = rgb(0, 255, 136);
const FAIL: CtColor = rgb(255, 85, 85);
const MUTED: CtColor = rgb(128, 128, 128);

fn ansi(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

pub fn get_styles() -> Styles {
    let heading = ansi(AnsiColor::Cyan).bold().underline();
    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(ansi(AnsiColor::Green).bold())
        .valid(ansi(AnsiColor::Green).bold())
        .invalid(ansi(AnsiColor::Red).bold())
        .error(ansi(AnsiColor::Red).bold())
        .placeholder(ansi(AnsiColor::BrightBlack))
}

pub fn print_success(message: &str) {
    println!(" {} {}", "✓".with(OK).bold(), message.with(OK));
}

pub fn print_error(message: &str) {
    eprintln!(" {} {}", "✗".with(FAIL).bold(), message.with(FAIL));
}

pub fn print_section_header(title: &str) {
    // Two spaces around the title and the two corners.
    let rule = SECTION_WIDTH.saturating_sub(title.width() + 4);
    let left = rule / 2;

    println!();
    println!(
        "{} {} {}",
        format!("╭{}", "─".repeat(left)).with(ACCENT),
        title.with(ACCENT).bold().attribute(Attribute::Italic),
        format!("{}╮", "─".repeat(rule - left)).with(ACCENT),
    );
}

pub fn print_section_footer() {
    println!("{}", format!("╰{}╯", "─".repeat(SECTION_WIDTH)).with(ACCENT));
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        "●".with(BULLET),
        format!("{}:", key).with(MUTED),
        value.bold()
    );
}

pub fn print_list_item(item: &str) {
    println!("  {}  {}", "▶".with(ACCENT), item);
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        "○".with(MUTED),
        message.with(MUTED).attribute(Attribute::Italic)
    );
}
