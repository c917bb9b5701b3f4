use cityweather_core::FetchState;
use std::fmt::Write;

/// Text for the result area: the current result (if any) followed by the
/// error message (if any). Empty when there is nothing to show yet.
pub fn render_state(state: &FetchState) -> String {
    let mut out = String::new();

    if let (Some(result), Some(query)) = (&state.result, &state.query) {
        let _ = writeln!(out, "Weather in: {}", query.city());
        let _ = writeln!(
            out,
            "Temperature: {:?}°{}",
            result.temperature,
            query.units().temperature_symbol()
        );
        let _ = writeln!(out, "Humidity: {}%", result.humidity);
        let _ = writeln!(out, "Environment: {}", result.description);

        if let Some(at) = state.updated_at {
            let local = at.with_timezone(&chrono::Local);
            let _ = writeln!(out, "Updated: {}", local.format("%H:%M:%S"));
        }
    }

    if let Some(message) = &state.error_message {
        let _ = writeln!(out, "{message}");
    }

    out
}
