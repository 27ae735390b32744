use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

pub const BUTTON_COUNT: usize = 9;

#[derive(Debug, Error)]
pub enum FrameError
{
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("expected 9 buttons, got {0}")]
    WrongLength(usize),
}

/// One snapshot of the pad: pressed state per button plus the reset flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonFrame
{
    pub buttons: [bool; BUTTON_COUNT],
    pub reset: bool,
}

#[derive(Deserialize)]
struct RawFrame
{
    buttons: Vec<bool>,
    #[serde(default)]
    reset: bool,
}

impl ButtonFrame
{
    pub fn released() -> Self
    {
        Self::default()
    }

    #[cfg(test)]
    pub fn pressed(index: usize) -> Self
    {
        let mut frame = Self::default();
        if let Some(button) = frame.buttons.get_mut(index) {
            *button = true;
        }
        frame
    }

    #[cfg(test)]
    pub fn with_reset(mut self) -> Self
    {
        self.reset = true;
        self
    }

    /// Indices that are pressed now but were not pressed in `previous`.
    pub fn rising_edges(&self, previous: &[bool; BUTTON_COUNT]) -> Vec<usize>
    {
        self.buttons
            .iter()
            .zip(previous.iter())
            .enumerate()
            .filter(|(_, (current, before))| **current && !**before)
            .map(|(index, _)| index)
            .collect()
    }
}

impl TryFrom<&Value> for ButtonFrame
{
    type Error = FrameError;

    fn try_from(value: &Value) -> Result<Self, Self::Error>
    {
        let raw = RawFrame::deserialize(value)?;
        let buttons: [bool; BUTTON_COUNT] = raw
            .buttons
            .as_slice()
            .try_into()
            .map_err(|_| FrameError::WrongLength(raw.buttons.len()))?;
        Ok(Self {
            buttons,
            reset: raw.reset,
        })
    }
}

impl FromStr for ButtonFrame
{
    type Err = FrameError;

    fn from_str(line: &str) -> Result<Self, Self::Err>
    {
        let value: Value = serde_json::from_str(line)?;
        Self::try_from(&value)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_frame()
    {
        let value = json!({
            "buttons": [false, true, false, false, false, false, false, false, true],
            "reset": true,
        });
        let frame = ButtonFrame::try_from(&value).unwrap();
        assert!(frame.buttons[1]);
        assert!(frame.buttons[8]);
        assert!(frame.reset);
    }

    #[test]
    fn reset_defaults_to_false()
    {
        let frame: ButtonFrame = r#"{"buttons":[false,false,false,false,false,false,false,false,false]}"#
            .parse()
            .unwrap();
        assert!(!frame.reset);
    }

    #[test]
    fn rejects_non_array_buttons()
    {
        for value in [json!({"buttons": "nope"}), json!({"buttons": 3}), json!({}), json!(null)] {
            assert!(matches!(
                ButtonFrame::try_from(&value),
                Err(FrameError::Malformed(_))
            ));
        }
    }

    #[test]
    fn rejects_wrong_length_and_non_booleans()
    {
        let short = json!({"buttons": [true, false]});
        assert!(matches!(
            ButtonFrame::try_from(&short),
            Err(FrameError::WrongLength(2))
        ));
        let numbers = json!({"buttons": [1, 0, 0, 0, 0, 0, 0, 0, 0]});
        assert!(ButtonFrame::try_from(&numbers).is_err());
    }

    #[test]
    fn rising_edges_ignore_held_buttons()
    {
        let mut previous = [false; BUTTON_COUNT];
        previous[2] = true;
        let mut frame = ButtonFrame::released();
        frame.buttons[2] = true;
        frame.buttons[5] = true;
        assert_eq!(frame.rising_edges(&previous), vec![5]);
        assert!(ButtonFrame::released().rising_edges(&previous).is_empty());
    }
}
