/// `H시간 M분 S초`, dropping leading zero units.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}시간 {minutes}분 {secs}초")
    } else if minutes > 0 {
        format!("{minutes}분 {secs}초")
    } else {
        format!("{secs}초")
    }
}

/// What `seconds` of time is worth at `hourly_wage`, rounded down. Zero when no wage is set.
pub fn calculate_cost(seconds: u64, hourly_wage: u64) -> u64 {
    if hourly_wage == 0 {
        return 0;
    }
    // Exact floor(seconds / 3600 * wage) without float rounding, capped at u64::MAX.
    u64::try_from(seconds as u128 * hourly_wage as u128 / 3600).unwrap_or(u64::MAX)
}

/// Inserts a comma every three digits: 1234567 → 1,234,567.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }
    formatted
}
