use teloxide::types::User;

use crate::bot::{constants::misc::SELF_REFERENCES, models::Participant};

// Name shown for a chat user: the username, else the full name.
pub fn sender_name(user: &User) -> String {
    match &user.username {
        Some(username) => username.clone(),
        None => format!(
            "{} {}",
            user.first_name,
            user.last_name.clone().unwrap_or_default()
        )
        .trim()
        .to_string(),
    }
}

pub fn sender_participant(user: &User) -> Participant {
    Participant::Platform {
        user_id: user.id.0,
        display_name: sender_name(user),
    }
}

// Whether a name extracted from a message means the sender.
pub fn is_self_reference(name: &str, sender: &str) -> bool {
    let name = name.trim().trim_start_matches('@');
    name == sender
        || SELF_REFERENCES
            .iter()
            .any(|word| name.eq_ignore_ascii_case(word))
}

/* Identity normalisation.
 * Self references collapse to the sender's platform identity. Everyone else is a
 * free-text member named exactly as written, minus a leading '@'. Blank names
 * resolve to nobody.
 */
pub fn normalize_participant(name: &str, sender: &Participant) -> Option<Participant> {
    if is_self_reference(name, sender.display_name()) {
        return Some(sender.clone());
    }
    let name = name.trim().trim_start_matches('@').trim();
    if name.is_empty() {
        return None;
    }
    Some(Participant::FreeText {
        display_name: name.to_string(),
    })
}
