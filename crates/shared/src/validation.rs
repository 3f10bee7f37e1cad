use crate::constants::*;

pub fn validate_message_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message content is required".into());
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_post_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Post content is required".into());
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(format!("Post must be at most {} characters", MAX_POST_LENGTH));
    }
    Ok(())
}

pub fn validate_comment_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Comment content is required".into());
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LENGTH
        ));
    }
    Ok(())
}

/// Categories are short lowercase slugs such as `running` or `strength-training`.
pub fn validate_category(category: &str) -> Result<(), String> {
    if category.is_empty() {
        return Err("Category is required".into());
    }
    if category.len() > MAX_CATEGORY_LENGTH {
        return Err(format!(
            "Category must be at most {} characters",
            MAX_CATEGORY_LENGTH
        ));
    }
    if !category
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(
            "Category can only contain lowercase letters, numbers, hyphens, and underscores"
                .into(),
        );
    }
    Ok(())
}

pub fn validate_conversation_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Conversation name is required".into());
    }
    if trimmed.chars().count() > MAX_CONVERSATION_NAME_LENGTH {
        return Err(format!(
            "Conversation name must be at most {} characters",
            MAX_CONVERSATION_NAME_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_event_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Event title is required".into());
    }
    if trimmed.chars().count() > MAX_EVENT_TITLE_LENGTH {
        return Err(format!(
            "Event title must be at most {} characters",
            MAX_EVENT_TITLE_LENGTH
        ));
    }
    Ok(())
}

/// Ratings arrive as JSON numbers; only whole numbers in 1..=5 are accepted.
pub fn validate_rating(score: f64) -> Result<i64, String> {
    if !score.is_finite() || score.fract() != 0.0 {
        return Err("Rating must be a whole number".into());
    }
    let score = score as i64;
    if !(MIN_RATING..=MAX_RATING).contains(&score) {
        return Err(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ));
    }
    Ok(score)
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), String> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err("Latitude must be between -90 and 90".into());
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err("Longitude must be between -180 and 180".into());
    }
    Ok(())
}

pub fn validate_radius_km(radius_km: f64) -> Result<(), String> {
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_RADIUS_KM {
        return Err(format!(
            "Radius must be greater than 0 and at most {} km",
            MAX_RADIUS_KM
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LENGTH
        ));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LENGTH
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Username can only contain letters, numbers, hyphens, and underscores".into(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}
