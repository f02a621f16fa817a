// Display formatters for privacy-preserving, readable output

use crate::domain::{EntryStatus, QueueEntry};
use serde::Serialize;

pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Keep the first two and last two characters, mask the rest with `X`
///
/// Inputs shorter than four characters are returned unchanged.
pub fn mask_phone(phone: &str) -> String {
    if phone.chars().count() < 4 {
        return phone.to_string();
    }

    let chars: Vec<char> = phone.trim().chars().collect();
    if chars.len() < 4 {
        return chars.into_iter().collect();
    }

    let mut masked = String::with_capacity(chars.len());
    masked.extend(&chars[..2]);
    masked.extend(std::iter::repeat('X').take(chars.len() - 4));
    masked.extend(&chars[chars.len() - 2..]);
    masked
}

/// "+91 98XXXXXX10"
pub fn format_phone_display(phone: &str, country_code: &str) -> String {
    format!("+{} {}", country_code, mask_phone(phone))
}

/// Capitalize every word, treating hyphens as word boundaries
pub fn to_title_case(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.split('-')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Coarse load indicator shown on reception screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClinicStatus {
    OnBreak,
    OnSchedule,
    Busy,
    VeryBusy,
}

impl ClinicStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClinicStatus::OnBreak => "On Break",
            ClinicStatus::OnSchedule => "On Schedule",
            ClinicStatus::Busy => "Busy",
            ClinicStatus::VeryBusy => "Very Busy",
        }
    }
}

impl std::fmt::Display for ClinicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn clinic_status(queue_length: usize, doctor_on_break: bool) -> ClinicStatus {
    if doctor_on_break {
        ClinicStatus::OnBreak
    } else if queue_length < 5 {
        ClinicStatus::OnSchedule
    } else if queue_length < 10 {
        ClinicStatus::Busy
    } else {
        ClinicStatus::VeryBusy
    }
}

/// Where a tracked patient stands, phrased for the patient
pub fn position_message(entry: &QueueEntry) -> String {
    match (entry.status, entry.position) {
        (EntryStatus::Done, _) => "Your consultation is complete".to_string(),
        (EntryStatus::InProgress, _) => "You are being served now".to_string(),
        (EntryStatus::Waiting, 0) => "You are next in line".to_string(),
        (EntryStatus::Waiting, 1) => "1 patient ahead of you".to_string(),
        (EntryStatus::Waiting, n) => format!("{} patients ahead of you", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryType;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("9876543210"), "98XXXXXX10");
        assert_eq!(mask_phone("1234"), "1234");
        assert_eq!(mask_phone("12345"), "12X45");
        assert_eq!(mask_phone("123"), "123");
        assert_eq!(mask_phone(""), "");
    }

    #[test]
    fn test_format_phone_display() {
        assert_eq!(
            format_phone_display("9876543210", DEFAULT_COUNTRY_CODE),
            "+91 98XXXXXX10"
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(to_title_case("prasad nagireddi"), "Prasad Nagireddi");
        assert_eq!(to_title_case("mary-jane o'neil"), "Mary-Jane O'neil");
        assert_eq!(to_title_case("  RAVI   kumar "), "Ravi Kumar");
        assert_eq!(to_title_case(""), "");
    }

    #[test]
    fn test_clinic_status_thresholds() {
        assert_eq!(clinic_status(0, false), ClinicStatus::OnSchedule);
        assert_eq!(clinic_status(4, false), ClinicStatus::OnSchedule);
        assert_eq!(clinic_status(5, false), ClinicStatus::Busy);
        assert_eq!(clinic_status(9, false), ClinicStatus::Busy);
        assert_eq!(clinic_status(10, false), ClinicStatus::VeryBusy);
        assert_eq!(clinic_status(10, true), ClinicStatus::OnBreak);
        assert_eq!(ClinicStatus::VeryBusy.to_string(), "Very Busy");
    }

    #[test]
    fn test_position_message() {
        let base = QueueEntry::new("a", 12, "Ravi", EntryType::WalkIn);
        assert_eq!(position_message(&base), "You are next in line");
        assert_eq!(
            position_message(&base.clone().with_position(1)),
            "1 patient ahead of you"
        );
        assert_eq!(
            position_message(&base.clone().with_position(4)),
            "4 patients ahead of you"
        );
        assert_eq!(
            position_message(&base.clone().with_status(EntryStatus::InProgress)),
            "You are being served now"
        );
        assert_eq!(
            position_message(&base.with_status(EntryStatus::Done)),
            "Your consultation is complete"
        );
    }
}
