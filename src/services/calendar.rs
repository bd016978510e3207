use crate::models::Booking;

const ICS_DATETIME: &str = "%Y%m%dT%H%M%S";

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Floating local times: the salon and its customers share one timezone.
pub fn generate_ics(booking: &Booking, style_name: &str, business_name: &str) -> String {
    let dtstart = booking.date.and_time(booking.start_time).format(ICS_DATETIME).to_string();
    let dtend = booking.date.and_time(booking.end_time).format(ICS_DATETIME).to_string();
    let dtstamp = booking.created_at.format(ICS_DATETIME).to_string();
    let uid = format!("{}@salonbook", booking.id);

    let summary = escape_text(&format!("{style_name} at {business_name}"));
    let description = escape_text(&format!(
        "Booking reference {}. {}",
        booking.reference,
        booking.notes.as_deref().unwrap_or("No additional notes")
    ));

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Salonbook//Appointments//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
