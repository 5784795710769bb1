use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::descriptor::{
    CommandDescriptor, InteractionKind, SlashCommandDescriptor, SubcommandGroup,
};
use crate::path::RoutingPath;
use crate::spec::{ApplicationCommandSpec, CommandOptionSpec, CommandType, OptionType};
use crate::validator::{
    check_description, check_name, invalid, validate_descriptor, MAX_CHILDREN,
};
use crate::{RegistryError, RouteNotFound};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    kind: InteractionKind,
    identifier: String,
}

impl RouteKey {
    fn new(kind: InteractionKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum ShapeMember {
    Subcommand(String),
    Group {
        name: String,
        description: String,
        actions: Vec<String>,
    },
}

impl ShapeMember {
    fn name(&self) -> &str {
        match self {
            ShapeMember::Subcommand(name) => name,
            ShapeMember::Group { name, .. } => name,
        }
    }
}

/// How one top-level slash command is laid out: either a bare leaf or a
/// parent of subcommands and groups, never both.
#[derive(Debug, Clone, Default)]
struct CommandShape {
    description: Option<String>,
    bare: bool,
    members: Vec<ShapeMember>,
}

impl CommandShape {
    fn member(&self, name: &str) -> Option<&ShapeMember> {
        self.members.iter().find(|m| m.name() == name)
    }
}

/// Accumulates descriptors and rejects conflicts as they are registered.
#[derive(Debug)]
pub struct RegistryBuilder<H> {
    routes: HashMap<RouteKey, Arc<CommandDescriptor<H>>>,
    order: Vec<RouteKey>,
    shapes: BTreeMap<String, CommandShape>,
}

impl<H> Default for RegistryBuilder<H> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            order: Vec::new(),
            shapes: BTreeMap::new(),
        }
    }
}

impl<H> RegistryBuilder<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Sets the description published for a command whose leaves are
    /// subcommands or groups.
    pub fn declare_command(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<&mut Self, RegistryError> {
        check_name(name, name)?;
        check_description(name, description)?;
        self.shapes.entry(name.to_string()).or_default().description =
            Some(description.to_string());
        Ok(self)
    }

    pub fn register(&mut self, descriptor: CommandDescriptor<H>) -> Result<&mut Self, RegistryError> {
        validate_descriptor(&descriptor)?;

        let key = RouteKey::new(descriptor.kind(), descriptor.identifier());
        if self.routes.contains_key(&key) {
            return Err(RegistryError::DuplicateIdentifier {
                kind: key.kind,
                identifier: key.identifier,
            });
        }
        if let CommandDescriptor::SlashCommand(slash) = &descriptor {
            self.check_leaf(&slash.path)?;
            self.attach_leaf(&slash.path);
        }

        debug!(kind = %key.kind, identifier = %key.identifier, "registered descriptor");
        self.order.push(key.clone());
        self.routes.insert(key, Arc::new(descriptor));
        Ok(self)
    }

    /// Registers a named sub-registry as `/command group action` leaves.
    /// Either every action is registered or none is.
    pub fn register_group(
        &mut self,
        command: &str,
        group: SubcommandGroup<H>,
    ) -> Result<&mut Self, RegistryError> {
        let group_id = format!("{command} {}", group.name);
        check_name(&group_id, command)?;
        check_name(&group_id, &group.name)?;
        check_description(&group_id, &group.description)?;
        if group.actions.is_empty() {
            return Err(invalid(&group_id, "a subcommand group needs at least one action"));
        }
        if group.actions.len() > MAX_CHILDREN {
            return Err(invalid(
                &group_id,
                format!("at most {MAX_CHILDREN} actions are allowed per group"),
            ));
        }

        if let Some(shape) = self.shapes.get(command) {
            if shape.bare {
                return Err(RegistryError::ShapeConflict {
                    command: command.to_string(),
                });
            }
            match shape.member(&group.name) {
                Some(ShapeMember::Group { .. }) => {
                    return Err(RegistryError::GroupConflict {
                        command: command.to_string(),
                        group: group.name,
                        existing: "subcommand group",
                    })
                }
                Some(ShapeMember::Subcommand(_)) => {
                    return Err(RegistryError::GroupConflict {
                        command: command.to_string(),
                        group: group.name,
                        existing: "subcommand",
                    })
                }
                None if shape.members.len() >= MAX_CHILDREN => {
                    return Err(invalid(
                        command,
                        format!("at most {MAX_CHILDREN} subcommands and groups are allowed"),
                    ))
                }
                None => {}
            }
        }

        let mut leaves = Vec::with_capacity(group.actions.len());
        for action in group.actions {
            let descriptor = CommandDescriptor::SlashCommand(SlashCommandDescriptor {
                path: RoutingPath::grouped(command, &group.name, &action.name),
                description: action.description,
                options: action.options,
                policy: action.policy,
                category: action.category,
                handler: action.handler,
            });
            validate_descriptor(&descriptor)?;
            let identifier = descriptor.identifier();
            if leaves
                .iter()
                .any(|d: &CommandDescriptor<H>| d.identifier() == identifier)
            {
                return Err(RegistryError::DuplicateIdentifier {
                    kind: InteractionKind::SlashCommand,
                    identifier,
                });
            }
            leaves.push(descriptor);
        }

        self.shapes
            .entry(command.to_string())
            .or_default()
            .members
            .push(ShapeMember::Group {
                name: group.name.clone(),
                description: group.description,
                actions: Vec::new(),
            });
        for leaf in leaves {
            self.register(leaf)?;
        }
        info!(command, group = %group.name, "registered subcommand group");
        Ok(self)
    }

    fn check_leaf(&self, path: &RoutingPath) -> Result<(), RegistryError> {
        let command = path.command_name();
        let Some(shape) = self.shapes.get(command) else {
            return match path.group_name() {
                Some(group) => Err(RegistryError::UndeclaredGroup {
                    command: command.to_string(),
                    group: group.to_string(),
                }),
                None => Ok(()),
            };
        };
        let shape_conflict = || RegistryError::ShapeConflict {
            command: command.to_string(),
        };

        match (path.group_name(), path.subcommand_name()) {
            (None, None) if !shape.members.is_empty() => Err(shape_conflict()),
            (None, None) => Ok(()),
            (_, Some(_)) if shape.bare => Err(shape_conflict()),
            (None, Some(sub)) => match shape.member(sub) {
                Some(ShapeMember::Group { .. }) => Err(RegistryError::GroupConflict {
                    command: command.to_string(),
                    group: sub.to_string(),
                    existing: "subcommand group",
                }),
                Some(ShapeMember::Subcommand(_)) => Ok(()),
                None if shape.members.len() >= MAX_CHILDREN => Err(invalid(
                    command,
                    format!("at most {MAX_CHILDREN} subcommands and groups are allowed"),
                )),
                None => Ok(()),
            },
            (Some(group), Some(_)) => match shape.member(group) {
                Some(ShapeMember::Group { actions, .. }) if actions.len() >= MAX_CHILDREN => {
                    Err(invalid(
                        command,
                        format!("at most {MAX_CHILDREN} actions are allowed per group"),
                    ))
                }
                Some(ShapeMember::Group { .. }) => Ok(()),
                _ => Err(RegistryError::UndeclaredGroup {
                    command: command.to_string(),
                    group: group.to_string(),
                }),
            },
            (Some(group), None) => Err(invalid(
                command,
                format!("group '{group}' has no subcommand"),
            )),
        }
    }

    fn attach_leaf(&mut self, path: &RoutingPath) {
        let shape = self.shapes.entry(path.command_name().to_string()).or_default();
        match (path.group_name(), path.subcommand_name()) {
            (None, None) => shape.bare = true,
            (None, Some(sub)) => {
                if shape.member(sub).is_none() {
                    shape.members.push(ShapeMember::Subcommand(sub.to_string()));
                }
            }
            (Some(group), Some(sub)) => {
                for member in shape.members.iter_mut() {
                    if let ShapeMember::Group { name, actions, .. } = member {
                        if name == group {
                            actions.push(sub.to_string());
                        }
                    }
                }
            }
            (Some(_), None) => {}
        }
    }

    pub fn build(self) -> RoutingTable<H> {
        let ordered = self
            .order
            .iter()
            .filter_map(|key| self.routes.get(key).cloned())
            .collect();
        RoutingTable {
            routes: self.routes,
            ordered,
            shapes: self.shapes,
            generation: 0,
            built_at: Utc::now(),
        }
    }
}

/// Immutable lookup structure the router resolves against.
pub struct RoutingTable<H> {
    routes: HashMap<RouteKey, Arc<CommandDescriptor<H>>>,
    ordered: Vec<Arc<CommandDescriptor<H>>>,
    shapes: BTreeMap<String, CommandShape>,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl<H> RoutingTable<H> {
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Sequence number assigned when the table was installed in a
    /// [`CommandRegistry`]. Zero for a table that was never installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<CommandDescriptor<H>>> {
        self.ordered.iter()
    }

    /// Exact match on `(command, group, subcommand)`. Context menus resolve
    /// by their bare command name; components and modals never match a path.
    pub fn resolve(
        &self,
        path: &RoutingPath,
        kind: InteractionKind,
    ) -> Result<Arc<CommandDescriptor<H>>, RouteNotFound> {
        match kind {
            InteractionKind::SlashCommand => self.lookup(kind, path.identifier()),
            InteractionKind::UserContext | InteractionKind::MessageContext if path.is_bare() => {
                self.lookup(kind, path.command_name().to_string())
            }
            _ => Err(RouteNotFound {
                kind,
                identifier: path.identifier(),
            }),
        }
    }

    pub fn resolve_custom_id(
        &self,
        identifier: &str,
        kind: InteractionKind,
    ) -> Result<Arc<CommandDescriptor<H>>, RouteNotFound> {
        self.lookup(kind, identifier.to_string())
    }

    fn lookup(
        &self,
        kind: InteractionKind,
        identifier: String,
    ) -> Result<Arc<CommandDescriptor<H>>, RouteNotFound> {
        let key = RouteKey::new(kind, identifier);
        match self.routes.get(&key) {
            Some(descriptor) => Ok(Arc::clone(descriptor)),
            None => Err(RouteNotFound {
                kind,
                identifier: key.identifier,
            }),
        }
    }

    fn slash(&self, path: &RoutingPath) -> Option<&SlashCommandDescriptor<H>> {
        match self
            .routes
            .get(&RouteKey::new(InteractionKind::SlashCommand, path.identifier()))
            .map(Arc::as_ref)
        {
            Some(CommandDescriptor::SlashCommand(slash)) => Some(slash),
            _ => None,
        }
    }

    /// Builds the bulk publication payload: chat-input commands, then user
    /// context menus, then message context menus, each sorted by name.
    pub fn publishable_specs(&self) -> Vec<ApplicationCommandSpec> {
        let mut specs: Vec<ApplicationCommandSpec> = self
            .shapes
            .iter()
            .filter_map(|(name, shape)| self.chat_input_spec(name, shape))
            .collect();

        for (kind, command_type) in [
            (InteractionKind::UserContext, CommandType::User),
            (InteractionKind::MessageContext, CommandType::Message),
        ] {
            let mut menus: Vec<ApplicationCommandSpec> = self
                .ordered
                .iter()
                .filter(|d| d.kind() == kind)
                .map(|d| ApplicationCommandSpec {
                    name: d.identifier(),
                    command_type,
                    description: String::new(),
                    options: Vec::new(),
                    dm_permission: d.policy().allowed_execution_environment.allows_direct(),
                })
                .collect();
            menus.sort_by(|a, b| a.name.cmp(&b.name));
            specs.extend(menus);
        }
        specs
    }

    fn chat_input_spec(&self, name: &str, shape: &CommandShape) -> Option<ApplicationCommandSpec> {
        if shape.bare {
            let leaf = self.slash(&RoutingPath::command(name))?;
            return Some(ApplicationCommandSpec {
                name: name.to_string(),
                command_type: CommandType::ChatInput,
                description: leaf.description.clone(),
                options: leaf.options.iter().map(CommandOptionSpec::from).collect(),
                dm_permission: leaf.policy.allowed_execution_environment.allows_direct(),
            });
        }
        if shape.members.is_empty() {
            return None;
        }

        let mut dm_permission = false;
        let mut leaf_spec = |path: RoutingPath, sub: &str| -> Option<CommandOptionSpec> {
            self.slash(&path).map(|leaf| {
                dm_permission |= leaf.policy.allowed_execution_environment.allows_direct();
                CommandOptionSpec::nested(
                    OptionType::SubCommand,
                    sub,
                    &leaf.description,
                    leaf.options.iter().map(CommandOptionSpec::from).collect(),
                )
            })
        };

        let mut options = Vec::with_capacity(shape.members.len());
        for member in &shape.members {
            match member {
                ShapeMember::Subcommand(sub) => {
                    options.extend(leaf_spec(RoutingPath::subcommand(name, sub), sub));
                }
                ShapeMember::Group {
                    name: group,
                    description,
                    actions,
                } => {
                    let nested = actions
                        .iter()
                        .filter_map(|action| {
                            leaf_spec(RoutingPath::grouped(name, group, action), action)
                        })
                        .collect();
                    options.push(CommandOptionSpec::nested(
                        OptionType::SubCommandGroup,
                        group,
                        description,
                        nested,
                    ));
                }
            }
        }

        Some(ApplicationCommandSpec {
            name: name.to_string(),
            command_type: CommandType::ChatInput,
            description: shape.description.clone().unwrap_or_else(|| name.to_string()),
            options,
            dm_permission,
        })
    }
}

/// Owner of the live routing table. Readers take an `Arc` snapshot; a
/// reload builds a complete table before swapping it in.
pub struct CommandRegistry<H> {
    current: RwLock<Arc<RoutingTable<H>>>,
    generation: AtomicU64,
}

impl<H> CommandRegistry<H> {
    pub fn new(mut table: RoutingTable<H>) -> Self {
        table.generation = 1;
        Self {
            current: RwLock::new(Arc::new(table)),
            generation: AtomicU64::new(1),
        }
    }

    pub fn snapshot(&self) -> Arc<RoutingTable<H>> {
        // The guarded value is a single Arc, so a poisoned lock still holds
        // a complete table.
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Installs a fully built table and returns its generation.
    pub fn replace(&self, mut table: RoutingTable<H>) -> Result<u64, RegistryError> {
        let mut current = self.current.write().map_err(|_| RegistryError::Poisoned)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        table.generation = generation;
        let routes = table.len();
        *current = Arc::new(table);
        drop(current);

        info!(generation, routes, "routing table swapped");
        Ok(generation)
    }

    /// Runs a registration pass into a fresh builder. The current table stays
    /// live unless the whole pass succeeds.
    pub fn reload<F>(&self, populate: F) -> Result<u64, RegistryError>
    where
        F: FnOnce(&mut RegistryBuilder<H>) -> Result<(), RegistryError>,
    {
        let mut builder = RegistryBuilder::new();
        if let Err(err) = populate(&mut builder) {
            warn!(error = %err, "registry reload rejected, keeping current routing table");
            return Err(err);
        }
        self.replace(builder.build())
    }
}
