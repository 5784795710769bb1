//! Registration, conflict detection, and resolution tests

use interaction_hub_registry::*;

fn slash(path: RoutingPath, env: ExecutionEnvironment) -> CommandDescriptor<&'static str> {
    let name = path.identifier();
    CommandDescriptor::SlashCommand(SlashCommandDescriptor {
        path,
        description: format!("Runs {name}"),
        options: Vec::new(),
        policy: CommandPolicy::new(env, AccessLevel::Everyone),
        category: Category::Utilities,
        handler: "slash",
    })
}

fn action(name: &str, env: ExecutionEnvironment) -> GroupAction<&'static str> {
    GroupAction {
        name: name.to_string(),
        description: format!("The {name} action"),
        options: Vec::new(),
        policy: CommandPolicy::new(env, AccessLevel::TenantAdmin),
        category: Category::TenantAdmin,
        handler: "action",
    }
}

fn component(custom_id: &str) -> CommandDescriptor<&'static str> {
    CommandDescriptor::Component(ComponentDescriptor {
        custom_id: custom_id.to_string(),
        policy: CommandPolicy::default(),
        category: Category::Utilities,
        handler: "component",
    })
}

fn user_menu(name: &str) -> CommandDescriptor<&'static str> {
    CommandDescriptor::UserContext(ContextMenuDescriptor {
        name: name.to_string(),
        policy: CommandPolicy::new(ExecutionEnvironment::TenantOnly, AccessLevel::Everyone),
        category: Category::Utilities,
        handler: "user",
    })
}

#[test]
fn test_duplicate_identifier_rejected() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(slash(RoutingPath::command("roll"), ExecutionEnvironment::TenantOnly))
        .unwrap();

    let err = builder
        .register(slash(RoutingPath::command("roll"), ExecutionEnvironment::Anywhere))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::DuplicateIdentifier {
            kind: InteractionKind::SlashCommand,
            ..
        }
    ));
    assert!(err.is_conflict());
    assert_eq!(builder.len(), 1);
}

#[test]
fn test_same_identifier_different_kind_allowed() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(component("feedback"))
        .unwrap()
        .register(slash(RoutingPath::command("feedback"), ExecutionEnvironment::Anywhere))
        .unwrap();
    assert_eq!(builder.len(), 2);

    let table = builder.build();
    let found = table
        .resolve_custom_id("feedback", InteractionKind::Component)
        .unwrap();
    assert_eq!(*found.handler(), "component");
    let found = table
        .resolve(&RoutingPath::command("feedback"), InteractionKind::SlashCommand)
        .unwrap();
    assert_eq!(*found.handler(), "slash");
}

#[test]
fn test_invalid_names_rejected() {
    let mut builder = RegistryBuilder::new();
    let err = builder
        .register(slash(RoutingPath::command("Roll"), ExecutionEnvironment::Anywhere))
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
    assert!(!err.is_conflict());
    assert!(builder.is_empty());
}

#[test]
fn test_group_conflicts_with_group() {
    let mut builder = RegistryBuilder::new();
    builder
        .register_group(
            "settings",
            SubcommandGroup::new("ai_chat", "AI chat settings")
                .action(action("mode", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap();

    let err = builder
        .register_group(
            "settings",
            SubcommandGroup::new("ai_chat", "Again")
                .action(action("list", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::GroupConflict { existing: "subcommand group", .. }));
    assert_eq!(builder.len(), 1);
}

#[test]
fn test_group_conflicts_with_subcommand() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(slash(
            RoutingPath::subcommand("settings", "ai_chat"),
            ExecutionEnvironment::TenantOnly,
        ))
        .unwrap();

    let err = builder
        .register_group(
            "settings",
            SubcommandGroup::new("ai_chat", "AI chat settings")
                .action(action("mode", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::GroupConflict { existing: "subcommand", .. }));

    // And the other way around.
    let mut builder = RegistryBuilder::new();
    builder
        .register_group(
            "settings",
            SubcommandGroup::new("ai_chat", "AI chat settings")
                .action(action("mode", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap();
    let err = builder
        .register(slash(
            RoutingPath::subcommand("settings", "ai_chat"),
            ExecutionEnvironment::TenantOnly,
        ))
        .unwrap_err();
    assert!(matches!(err, RegistryError::GroupConflict { .. }));
}

#[test]
fn test_bare_command_cannot_have_children() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(slash(RoutingPath::command("roll"), ExecutionEnvironment::Anywhere))
        .unwrap();
    let err = builder
        .register(slash(RoutingPath::subcommand("roll", "d20"), ExecutionEnvironment::Anywhere))
        .unwrap_err();
    assert_eq!(err, RegistryError::ShapeConflict { command: "roll".into() });

    let mut builder = RegistryBuilder::new();
    builder
        .register(slash(RoutingPath::subcommand("roll", "d20"), ExecutionEnvironment::Anywhere))
        .unwrap();
    let err = builder
        .register(slash(RoutingPath::command("roll"), ExecutionEnvironment::Anywhere))
        .unwrap_err();
    assert_eq!(err, RegistryError::ShapeConflict { command: "roll".into() });
}

#[test]
fn test_grouped_leaf_requires_declared_group() {
    let mut builder = RegistryBuilder::new();
    let err = builder
        .register(slash(
            RoutingPath::grouped("settings", "ai_chat", "mode"),
            ExecutionEnvironment::TenantOnly,
        ))
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::UndeclaredGroup {
            command: "settings".into(),
            group: "ai_chat".into()
        }
    );

    builder
        .register_group(
            "settings",
            SubcommandGroup::new("ai_chat", "AI chat settings")
                .action(action("list", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap();
    builder
        .register(slash(
            RoutingPath::grouped("settings", "ai_chat", "mode"),
            ExecutionEnvironment::TenantOnly,
        ))
        .unwrap();
    assert_eq!(builder.len(), 2);
}

#[test]
fn test_group_with_duplicate_actions_registers_nothing() {
    let mut builder = RegistryBuilder::new();
    let err = builder
        .register_group(
            "settings",
            SubcommandGroup::new("server_admin_roles", "Admin roles")
                .action(action("add", ExecutionEnvironment::TenantOnly))
                .action(action("add", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateIdentifier { .. }));
    assert!(builder.is_empty());

    // The failed group did not reserve its name.
    builder
        .register_group(
            "settings",
            SubcommandGroup::new("server_admin_roles", "Admin roles")
                .action(action("add", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap();
}

#[test]
fn test_resolve_exact_paths() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(slash(RoutingPath::command("ping"), ExecutionEnvironment::Anywhere))
        .unwrap()
        .register_group(
            "settings",
            SubcommandGroup::new("server_admin_roles", "Admin roles")
                .action(action("add", ExecutionEnvironment::TenantOnly))
                .action(action("remove", ExecutionEnvironment::TenantOnly)),
        )
        .unwrap();
    let table = builder.build();

    let found = table
        .resolve(
            &RoutingPath::grouped("settings", "server_admin_roles", "remove"),
            InteractionKind::SlashCommand,
        )
        .unwrap();
    assert_eq!(found.identifier(), "settings server_admin_roles remove");
    assert_eq!(found.policy().required_access_level, AccessLevel::TenantAdmin);

    for missing in [
        RoutingPath::command("settings"),
        RoutingPath::subcommand("settings", "server_admin_roles"),
        RoutingPath::grouped("settings", "server_admin_roles", "reset"),
        RoutingPath::grouped("settings", "ai_chat", "add"),
        RoutingPath::subcommand("ping", "now"),
    ] {
        let err = table
            .resolve(&missing, InteractionKind::SlashCommand)
            .unwrap_err();
        assert_eq!(err.identifier, missing.identifier());
    }

    assert!(table
        .resolve(&RoutingPath::command("ping"), InteractionKind::Component)
        .is_err());
}

#[test]
fn test_context_menus_resolve_by_name() {
    let mut builder = RegistryBuilder::new();
    builder.register(user_menu("user_info")).unwrap();
    let table = builder.build();

    assert!(table
        .resolve(&RoutingPath::command("user_info"), InteractionKind::UserContext)
        .is_ok());
    assert!(table
        .resolve(&RoutingPath::command("user_info"), InteractionKind::MessageContext)
        .is_err());
    assert!(table
        .resolve_custom_id("user_info", InteractionKind::UserContext)
        .is_ok());
}

#[test]
fn test_multi_word_context_menu_registers_and_resolves() {
    let mut builder = RegistryBuilder::new();
    builder.register(user_menu("Quick User Info")).unwrap();
    let table = builder.build();

    let descriptor = table
        .resolve(&RoutingPath::command("Quick User Info"), InteractionKind::UserContext)
        .expect("failed to resolve context menu");
    assert_eq!(descriptor.identifier(), "Quick User Info");
    assert!(table
        .resolve(&RoutingPath::command("Quick"), InteractionKind::UserContext)
        .is_err());

    let specs = table.publishable_specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name, "Quick User Info");
    assert_eq!(specs[0].command_type, CommandType::User);
}

#[test]
fn test_context_menu_name_rules() {
    let mut builder = RegistryBuilder::new();
    for bad in ["", " Leading", "Trailing ", "a name well beyond thirty-two chars"] {
        let err = builder.register(user_menu(bad)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDescriptor { .. }), "{bad:?}");
    }

    // Slash commands keep the stricter lowercase rule.
    let err = builder
        .register(slash(RoutingPath::command("Quick Info"), ExecutionEnvironment::Anywhere))
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
}

#[test]
fn test_reload_failure_keeps_previous_table() {
    let mut builder = RegistryBuilder::new();
    builder
        .register(slash(RoutingPath::command("ping"), ExecutionEnvironment::Anywhere))
        .unwrap();
    let registry = CommandRegistry::new(builder.build());
    assert_eq!(registry.generation(), 1);
    let before = registry.snapshot();

    let err = registry
        .reload(|builder| {
            builder.register(slash(RoutingPath::command("roll"), ExecutionEnvironment::Anywhere))?;
            builder.register(slash(RoutingPath::command("roll"), ExecutionEnvironment::Anywhere))?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.is_conflict());

    let after = registry.snapshot();
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(registry.generation(), 1);
    assert!(after
        .resolve(&RoutingPath::command("roll"), InteractionKind::SlashCommand)
        .is_err());
}

#[test]
fn test_reload_swaps_whole_table() {
    let registry = CommandRegistry::new(RoutingTable::empty());
    let held = registry.snapshot();
    assert!(held.is_empty());

    let generation = registry
        .reload(|builder| {
            builder.register(slash(RoutingPath::command("ping"), ExecutionEnvironment::Anywhere))?;
            builder.register(component("feedback_open"))?;
            Ok(())
        })
        .unwrap();
    assert_eq!(generation, 2);

    let current = registry.snapshot();
    assert_eq!(current.len(), 2);
    assert_eq!(current.generation(), 2);
    // A snapshot taken before the reload is unaffected.
    assert!(held.is_empty());
}
