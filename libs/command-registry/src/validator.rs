use once_cell::sync::Lazy;
use regex::Regex;

use crate::descriptor::{CommandDescriptor, OptionKind, OptionSchema};
use crate::RegistryError;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-_a-z0-9]{1,32}$").unwrap());
/// Context menus carry display names: mixed case and inner spaces allowed.
static CONTEXT_MENU_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w'-](?:[\w' -]{0,30}[\w'-])?$").unwrap());

pub const MAX_DESCRIPTION_LEN: usize = 100;
pub const MAX_CUSTOM_ID_LEN: usize = 100;
/// Platform cap on options, subcommands, and groups per level.
pub const MAX_CHILDREN: usize = 25;

pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

pub fn is_valid_context_menu_name(name: &str) -> bool {
    CONTEXT_MENU_NAME_PATTERN.is_match(name)
}

pub(crate) fn check_name(identifier: &str, name: &str) -> Result<(), RegistryError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(invalid(
            identifier,
            format!("name '{name}' must match ^[-_a-z0-9]{{1,32}}$"),
        ))
    }
}

fn check_context_menu_name(name: &str) -> Result<(), RegistryError> {
    if is_valid_context_menu_name(name) {
        Ok(())
    } else {
        Err(invalid(
            name,
            "context menu name must be 1-32 characters without leading or trailing spaces",
        ))
    }
}

pub(crate) fn check_description(identifier: &str, description: &str) -> Result<(), RegistryError> {
    let len = description.chars().count();
    if len == 0 || len > MAX_DESCRIPTION_LEN {
        return Err(invalid(
            identifier,
            format!("description must be 1-{MAX_DESCRIPTION_LEN} characters, got {len}"),
        ));
    }
    Ok(())
}

pub(crate) fn check_options(identifier: &str, options: &[OptionSchema]) -> Result<(), RegistryError> {
    if options.len() > MAX_CHILDREN {
        return Err(invalid(
            identifier,
            format!("at most {MAX_CHILDREN} options are allowed"),
        ));
    }

    let mut seen_optional = false;
    for (index, option) in options.iter().enumerate() {
        check_name(identifier, &option.name)?;
        check_description(identifier, &option.description)?;

        if options[..index].iter().any(|o| o.name == option.name) {
            return Err(invalid(
                identifier,
                format!("option '{}' is declared twice", option.name),
            ));
        }
        if option.required && seen_optional {
            return Err(invalid(
                identifier,
                format!("required option '{}' follows an optional one", option.name),
            ));
        }
        seen_optional |= !option.required;

        let numeric = matches!(option.kind, OptionKind::Integer | OptionKind::Number);
        if !numeric && (option.min_value.is_some() || option.max_value.is_some()) {
            return Err(invalid(
                identifier,
                format!("option '{}' is not numeric but declares bounds", option.name),
            ));
        }
        if let (Some(min), Some(max)) = (option.min_value, option.max_value) {
            if min > max {
                return Err(invalid(
                    identifier,
                    format!("option '{}' has min {min} above max {max}", option.name),
                ));
            }
        }
    }
    Ok(())
}

/// Checks platform naming rules for one descriptor.
pub(crate) fn validate_descriptor<H>(descriptor: &CommandDescriptor<H>) -> Result<(), RegistryError> {
    let identifier = descriptor.identifier();
    match descriptor {
        CommandDescriptor::SlashCommand(d) => {
            for segment in d.path.segments() {
                check_name(&identifier, segment)?;
            }
            check_description(&identifier, &d.description)?;
            check_options(&identifier, &d.options)
        }
        CommandDescriptor::UserContext(d) | CommandDescriptor::MessageContext(d) => {
            check_context_menu_name(&d.name)
        }
        CommandDescriptor::Component(d) => check_custom_id(&d.custom_id),
        CommandDescriptor::Modal(d) => {
            check_custom_id(&d.custom_id)?;
            if d.title.is_empty() || d.title.chars().count() > 45 {
                return Err(invalid(&identifier, "modal title must be 1-45 characters"));
            }
            Ok(())
        }
    }
}

fn check_custom_id(custom_id: &str) -> Result<(), RegistryError> {
    if custom_id.is_empty() || custom_id.len() > MAX_CUSTOM_ID_LEN {
        return Err(invalid(
            custom_id,
            format!("custom id must be 1-{MAX_CUSTOM_ID_LEN} bytes"),
        ));
    }
    Ok(())
}

pub(crate) fn invalid(identifier: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidDescriptor {
        identifier: identifier.to_string(),
        reason: reason.into(),
    }
}
