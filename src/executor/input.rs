// Physical input simulation via enigo. Every function blocks; callers run them
// on a blocking thread.
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

use crate::errors::{PilotError, PilotResult};
use crate::executor::coordinator::normalized_to_physical;

fn connect() -> PilotResult<Enigo> {
    Enigo::new(&Settings::default())
        .map_err(|e| PilotError::Desktop(format!("input connection failed: {e}")))
}

fn input_err(action: &str) -> impl FnOnce(enigo::InputError) -> PilotError + '_ {
    move |e| PilotError::Desktop(format!("{action} failed: {e}"))
}

/// Moves the cursor to a 0..=1000 normalized point on the main display.
pub fn move_mouse_normalized(x: f64, y: f64) -> PilotResult<(i32, i32)> {
    let mut enigo = connect()?;
    let (w, h) = enigo.main_display().map_err(input_err("main_display"))?;
    let (px, py) = normalized_to_physical(x, y, (0, 0), w.max(1) as u32, h.max(1) as u32);
    enigo
        .move_mouse(px, py, Coordinate::Abs)
        .map_err(input_err("move_mouse"))?;
    Ok((px, py))
}

pub fn mouse_click() -> PilotResult<()> {
    let mut enigo = connect()?;
    enigo
        .button(Button::Left, Direction::Click)
        .map_err(input_err("click"))
}

pub fn type_text(text: &str) -> PilotResult<()> {
    if text.is_empty() {
        return Ok(());
    }
    let mut enigo = connect()?;
    enigo.text(text).map_err(input_err("type_text"))
}

/// One wheel notch; positive lengths scroll down.
pub fn scroll_down() -> PilotResult<()> {
    let mut enigo = connect()?;
    enigo
        .scroll(1, Axis::Vertical)
        .map_err(input_err("scroll"))
}

/// Current cursor position in absolute display coordinates.
pub fn cursor_location() -> PilotResult<(i32, i32)> {
    let enigo = connect()?;
    enigo.location().map_err(input_err("cursor_location"))
}
