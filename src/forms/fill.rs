//! Synthetic fill values by field type

pub const TEST_EMAIL: &str = "test@example.com";
pub const TEST_PASSWORD: &str = "TestPassword123!";
pub const TEST_PHONE: &str = "1234567890";
pub const TEST_NUMBER: &str = "42";
pub const TEST_URL: &str = "https://example.com";
pub const TEST_DATE: &str = "2024-01-01";
pub const TEST_MESSAGE: &str = "This is a test message.";
pub const TEST_TEXT: &str = "Test input";

/// How one control gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillAction {
    /// Typed as keyboard input
    Type(&'static str),
    /// Assigned directly (hidden and picker-style inputs)
    SetValue(&'static str),
    /// Assigned only when the control is empty, so server tokens survive
    SetIfEmpty(&'static str),
    Check,
    SelectFirstOption,
    Skip,
}

/// Picks the fill action for a control
///
/// `input_type` is the lowercase `type` attribute (`text` when absent).
pub fn fill_action(tag: &str, input_type: &str) -> FillAction {
    match tag {
        "textarea" => return FillAction::Type(TEST_MESSAGE),
        "select" => return FillAction::SelectFirstOption,
        "input" => {}
        _ => return FillAction::Skip,
    }

    match input_type {
        "button" | "submit" | "reset" | "image" | "file" => FillAction::Skip,
        "email" => FillAction::Type(TEST_EMAIL),
        "password" => FillAction::Type(TEST_PASSWORD),
        "tel" => FillAction::Type(TEST_PHONE),
        "number" => FillAction::Type(TEST_NUMBER),
        "url" => FillAction::Type(TEST_URL),
        "date" => FillAction::SetValue(TEST_DATE),
        "datetime-local" => FillAction::SetValue("2024-01-01T12:00"),
        "month" => FillAction::SetValue("2024-01"),
        "week" => FillAction::SetValue("2024-W01"),
        "time" => FillAction::SetValue("12:00"),
        "color" => FillAction::SetValue("#336699"),
        "range" => FillAction::SetValue("50"),
        "checkbox" | "radio" => FillAction::Check,
        "hidden" => FillAction::SetIfEmpty(TEST_TEXT),
        _ => FillAction::Type(TEST_TEXT),
    }
}
