use embedded_hal::i2c::I2c;

use crate::{
    display::{DisplayController, HEIGHT, WIDTH},
    error::DisplayError,
    icons::{glyph_for, IconGlyph},
    zone::{classify, MoistureStatus},
};

const LINE_HEIGHT: i32 = 10;
const GLYPH_WIDTH: i32 = 6;

const ICON_X: i32 = 2;
const ICON_Y: i32 = 0;
const LABEL_X: i32 = ICON_X + IconGlyph::WIDTH as i32 + 4;
const LABEL_Y: i32 = (HEIGHT as i32 - LINE_HEIGHT) / 2;

pub fn show_splash<I2C: I2c>(
    display: &mut DisplayController<I2C>,
    version: &str,
) -> Result<(), DisplayError> {
    let version_line = format!(" {version}");
    show_lines(display, &["ESP32-C3", "OLED", "Sensor V:", &version_line])
}

pub fn show_readings<I2C: I2c>(
    display: &mut DisplayController<I2C>,
    battery_volts: f32,
    sensor_volts: f32,
    status: MoistureStatus,
    count: u32,
) -> Result<(), DisplayError> {
    let battery = format!("Ba:{battery_volts:.4}V");
    let sensor = format!("Se:{sensor_volts:.4}V");
    let count = format!("#{count}");
    show_lines(display, &[&battery, &sensor, status.as_str(), &count])
}

pub fn show_zone_icon<I2C: I2c>(
    display: &mut DisplayController<I2C>,
    adc: i32,
) -> Result<(), DisplayError> {
    let classification = classify(adc);

    display.fill(false);
    display.blit_glyph(glyph_for(classification.icon), ICON_X, ICON_Y);
    display.draw_text(classification.status.as_str(), LABEL_X, LABEL_Y);
    display.flush()
}

/// One horizontally centred line; an empty `text` blanks the panel.
pub fn show_message<I2C: I2c>(
    display: &mut DisplayController<I2C>,
    text: &str,
) -> Result<(), DisplayError> {
    let text_width = text.chars().count() as i32 * GLYPH_WIDTH;
    let x = ((WIDTH as i32 - text_width) / 2).max(0);

    display.fill(false);
    display.draw_text(text, x, LABEL_Y);
    display.flush()
}

fn show_lines<I2C: I2c>(
    display: &mut DisplayController<I2C>,
    lines: &[&str],
) -> Result<(), DisplayError> {
    display.fill(false);
    for (row, line) in lines.iter().enumerate() {
        display.draw_text(line, 0, row as i32 * LINE_HEIGHT);
    }
    display.flush()
}

#[cfg(test)]
mod tests {
    use core::ops::Range;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{display::PAGES, icons::IconId, testing::RecordingBus};

    fn display() -> (DisplayController<RecordingBus>, RecordingBus) {
        let bus = RecordingBus::default();
        (DisplayController::new(bus.clone()), bus)
    }

    fn lit_in(display: &DisplayController<RecordingBus>, xs: Range<i32>, ys: Range<i32>) -> bool {
        xs.into_iter().any(|x| ys.clone().any(|y| display.pixel(x, y)))
    }

    #[test]
    fn icon_screen_draws_zone_glyph_and_label() {
        let (mut display, bus) = display();

        show_zone_icon(&mut display, 600).unwrap();

        let glyph = glyph_for(IconId::FlowerTwoLeaves);
        for y in 0..IconGlyph::HEIGHT {
            for x in 0..IconGlyph::WIDTH {
                assert_eq!(
                    display.pixel(ICON_X + x as i32, ICON_Y + y as i32),
                    glyph.is_set(x, y)
                );
            }
        }
        assert!(lit_in(&display, LABEL_X..WIDTH as i32, LABEL_Y..LABEL_Y + LINE_HEIGHT));
        assert_eq!(bus.writes().len(), PAGES * 4);
    }

    #[test]
    fn overload_sample_shows_warning_glyph() {
        let (mut display, _bus) = display();

        show_zone_icon(&mut display, 900).unwrap();

        let glyph = glyph_for(IconId::Warning);
        let drawn = (0..IconGlyph::HEIGHT).all(|y| {
            (0..IconGlyph::WIDTH)
                .all(|x| display.pixel(ICON_X + x as i32, y as i32) == glyph.is_set(x, y))
        });
        assert!(drawn);
    }

    #[test]
    fn readings_screen_uses_four_text_rows() {
        let (mut display, _bus) = display();

        show_readings(&mut display, 3.707, 0.7238, MoistureStatus::Optimal, 12).unwrap();

        for row in 0..4 {
            let top = row * LINE_HEIGHT;
            assert!(lit_in(&display, 0..WIDTH as i32, top..top + LINE_HEIGHT), "row {row}");
        }
    }

    #[test]
    fn screens_replace_previous_content() {
        let (mut display, _bus) = display();
        display.fill(true);

        show_splash(&mut display, "3.0j").unwrap();

        // Nothing on the splash reaches the last column.
        assert!(!lit_in(&display, 66..WIDTH as i32, 0..HEIGHT as i32));
    }

    #[test]
    fn empty_message_blanks_panel() {
        let (mut display, _bus) = display();
        display.fill(true);

        show_message(&mut display, "").unwrap();

        assert!(display.buffer().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn message_is_centred() {
        let (mut display, _bus) = display();

        show_message(&mut display, "Stop").unwrap();

        assert!(!lit_in(&display, 0..24, 0..HEIGHT as i32));
        assert!(lit_in(&display, 24..48, LABEL_Y..LABEL_Y + LINE_HEIGHT));
        assert!(!lit_in(&display, 48..WIDTH as i32, 0..HEIGHT as i32));
    }

    #[test]
    fn bus_failure_is_reported() {
        let (mut display, bus) = display();
        bus.fail_after(0);

        assert!(matches!(
            show_message(&mut display, "Stop"),
            Err(DisplayError::Bus(_))
        ));
    }
}
