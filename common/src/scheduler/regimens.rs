// Demo regimens applied to a fresh kiosk so reminders are visible right away

/// One template per catalog position. The first three also get a reminder a
/// few minutes after startup (see `NEAR_TERM_OFFSETS_MINUTES`).
pub const EXAMPLE_REGIMENS: [(&[&str], &str); 10] = [
    (&["08:00", "14:00", "20:00"], "Pain relief - every 6 hours"),
    (&["09:00"], "Cardiovascular protection - morning dose"),
    (&["07:00", "15:00", "23:00"], "Anti-inflammatory - three times daily"),
    (&["08:00", "16:00", "00:00"], "Antibiotic - every 8 hours"),
    (&["06:30", "18:30"], "Twice daily - morning and evening"),
    (&["07:30", "19:30"], "Blood pressure - twice daily"),
    (&["07:00", "12:00", "18:00"], "Diabetes - with meals"),
    (&["08:30"], "Heart medication - once daily"),
    (&["09:30"], "Daily vitamin supplement"),
    (&["22:00"], "Sleep aid - bedtime"),
];

pub const NEAR_TERM_OFFSETS_MINUTES: [i64; 3] = [2, 5, 8];
