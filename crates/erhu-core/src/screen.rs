//! Fixed tuning-fork screen.
//!
//! Stateless drawing of the 128x64 frame: title box, the two string labels
//! with the selected one outlined, and the status line on top.

use core::fmt::Write as _;

use embedded_graphics::{
    Drawable as _,
    mono_font::{
        MonoTextStyleBuilder,
        ascii::{FONT_4X6, FONT_8X13},
    },
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, Point, Primitive as _, Size},
    primitives::{PrimitiveStyle, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::{
    app::{App, StringSelection, Volume},
    consts,
};

pub(crate) fn draw<D>(app: &App, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = consts::ColorType>,
{
    target.clear(BinaryColor::Off)?;

    let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    Rectangle::new(Point::zero(), Size::new(consts::WIDTH, consts::HEIGHT))
        .into_styled(outline)
        .draw(target)?;

    // title box
    RoundedRectangle::with_equal_corners(
        Rectangle::new(Point::new(20, 10), Size::new(88, 24)),
        Size::new(4, 4),
    )
    .into_styled(outline)
    .draw(target)?;

    let title_style = MonoTextStyleBuilder::new()
        .font(&FONT_8X13)
        .text_color(BinaryColor::On)
        .build();
    let small_style = MonoTextStyleBuilder::new()
        .font(&FONT_4X6)
        .text_color(BinaryColor::On)
        .build();

    let center_x = consts::WIDTH as i32 / 2;

    Text::with_text_style(
        "ERHU",
        Point::new(center_x, 22),
        title_style,
        TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Bottom)
            .build(),
    )
    .draw(target)?;

    Text::with_text_style(
        "Tuning Fork",
        Point::new(center_x, 32),
        small_style,
        TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build(),
    )
    .draw(target)?;

    // string options
    Text::with_text_style(
        "< Inner (D4)",
        Point::new(10, 52),
        small_style,
        TextStyleBuilder::new()
            .alignment(Alignment::Left)
            .baseline(Baseline::Middle)
            .build(),
    )
    .draw(target)?;

    Text::with_text_style(
        "Outer (A4) >",
        Point::new(consts::WIDTH as i32 - 10, 52),
        small_style,
        TextStyleBuilder::new()
            .alignment(Alignment::Right)
            .baseline(Baseline::Middle)
            .build(),
    )
    .draw(target)?;

    // outline the selected string
    let selected = match app.selection {
        StringSelection::Inner => Rectangle::new(Point::new(4, 44), Size::new(64, 16)),
        StringSelection::Outer => Rectangle::new(Point::new(60, 44), Size::new(64, 16)),
    };
    RoundedRectangle::with_equal_corners(selected, Size::new(3, 3))
        .into_styled(outline)
        .draw(target)?;

    let status = status_line(app.volume, app.playing);
    Text::with_text_style(
        status.as_str(),
        Point::new(center_x, 6),
        small_style,
        TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build(),
    )
    .draw(target)?;

    Ok(())
}

/// Assemble the status line and cut it to the first
/// [`consts::STATUS_LINE_MAX`] characters, mid-word if that is where the
/// cut lands.
pub(crate) fn status_line(volume: Volume, playing: bool) -> heapless::String<48> {
    let mut line = heapless::String::new();
    let _ = write!(
        line,
        "Vol {}%  {}  OK=Toggle  Back(Hold)=Quit",
        volume.percent(),
        if playing { "Play" } else { "Ready" },
    );
    line.truncate(consts::STATUS_LINE_MAX);
    line
}

#[cfg(test)]
mod tests {
    use embedded_graphics::mock_display::MockDisplay;

    use super::*;

    #[test]
    fn status_line_is_cut_to_twenty_chars() {
        let mut volume = Volume::default_level();
        assert_eq!(status_line(volume, false).as_str(), "Vol 50%  Ready  OK=T");
        assert_eq!(status_line(volume, true).as_str(), "Vol 50%  Play  OK=To");

        for _ in 0..40 {
            volume.up();
        }
        let line = status_line(volume, true);
        assert!(line.len() <= consts::STATUS_LINE_MAX);
        assert!(line.starts_with("Vol 100%"));
    }

    #[test]
    fn status_line_never_exceeds_the_cut() {
        let mut volume = Volume::default_level();
        for _ in 0..40 {
            volume.down();
        }
        assert!(status_line(volume, false).len() <= consts::STATUS_LINE_MAX);
        assert!(status_line(volume, true).len() <= consts::STATUS_LINE_MAX);
    }

    #[test]
    fn draw_completes_for_both_selections() {
        let mut app = App::new();

        // the mock display is smaller than the real panel; this only
        // checks that the draw path runs to completion
        let mut display = MockDisplay::<BinaryColor>::new();
        display.set_allow_overdraw(true);
        display.set_allow_out_of_bounds_drawing(true);
        app.render(&mut display).unwrap();

        app.selection = StringSelection::Inner;
        app.playing = true;
        let mut display = MockDisplay::<BinaryColor>::new();
        display.set_allow_overdraw(true);
        display.set_allow_out_of_bounds_drawing(true);
        app.render(&mut display).unwrap();
    }
}
