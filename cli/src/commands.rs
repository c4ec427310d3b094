//! Subcommands and their execution.

use anyhow::{anyhow, bail};
use clap::{ArgAction, Args, Subcommand};
use govlock_authority::CapabilityRegistry;
use govlock_governance::{GovernanceClient, GovernanceError, GovernedParam, Outcome, SecurityTier};
use govlock_ledger::Ledger;
use govlock_timelock::TimelockRole;
use govlock_types::{Address, Hash32, RoleId};
use govlock_utils::{format_duration, parse_duration};

use crate::resolve;
use crate::session::Session;

/// Which timelock an operation goes through, and its salt.
#[derive(Args, Clone, Copy, Debug)]
pub struct Route {
    /// Use the highsec timelock instead of lowsec.
    #[arg(long)]
    pub highsec: bool,

    /// Salt distinguishing otherwise identical operations.
    #[arg(long, default_value = "0x0")]
    pub salt: Hash32,
}

impl Route {
    fn tier(&self) -> SecurityTier {
        SecurityTier::from_highsec_flag(self.highsec)
    }
}

#[derive(Args, Clone, Copy, Debug)]
pub struct Salt {
    /// Salt distinguishing otherwise identical operations.
    #[arg(long, default_value = "0x0")]
    pub salt: Hash32,
}

#[derive(Args, Clone, Copy, Debug)]
pub struct Tier {
    /// Use the highsec timelock instead of lowsec.
    #[arg(long)]
    pub highsec: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy the genesis configuration into an empty data directory.
    Init,
    /// Print the built-in deployment as a genesis TOML file.
    Genesis,
    /// Contracts, timelock delays and role members.
    Status,
    /// Governed protocol parameters.
    Param {
        #[command(subcommand)]
        action: ParamAction,
    },
    /// Capability registry administration, always through highsec.
    Authority {
        #[command(subcommand)]
        action: AuthorityAction,
    },
    /// Timelock roles, delay and operations.
    Timelock {
        #[command(subcommand)]
        action: TimelockAction,
    },
    /// Read-only queries against the capability registry.
    Lens {
        #[command(subcommand)]
        action: LensAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ParamAction {
    /// Every governed parameter with its current value.
    List,
    Get {
        param: GovernedParam,
    },
    /// Move a parameter change one step: queue it, report the wait, or execute it.
    Set {
        param: GovernedParam,
        value: String,
        #[command(flatten)]
        route: Route,
        /// Apply immediately as the actor (emergency switches only).
        #[arg(long, conflicts_with = "highsec")]
        direct: bool,
    },
    /// Collateral feed source and redemption fee floor as one batch operation.
    FeedSourceAndFeeFloor {
        #[arg(action = ArgAction::Set)]
        dynamic_feed: bool,
        fee_floor: u128,
        #[command(flatten)]
        route: Route,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthorityAction {
    SetRoleName {
        role: RoleId,
        name: String,
        #[command(flatten)]
        salt: Salt,
    },
    SetUserRole {
        user: String,
        role: RoleId,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
        #[command(flatten)]
        salt: Salt,
    },
    SetRoleCapability {
        role: RoleId,
        target: String,
        function: String,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
        #[command(flatten)]
        salt: Salt,
    },
    SetPublicCapability {
        target: String,
        function: String,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
        #[command(flatten)]
        salt: Salt,
    },
    /// Permanently disable a function. Cannot be undone.
    BurnCapability {
        target: String,
        function: String,
        #[command(flatten)]
        salt: Salt,
    },
    /// Hand control of the registry to another authority.
    SetAuthority {
        authority: String,
        #[command(flatten)]
        salt: Salt,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimelockAction {
    GrantRole {
        role: TimelockRole,
        account: String,
        #[command(flatten)]
        route: Route,
    },
    RevokeRole {
        role: TimelockRole,
        account: String,
        #[command(flatten)]
        route: Route,
    },
    /// Change the minimum delay, e.g. `36h`.
    UpdateDelay {
        #[arg(value_parser = parse_duration)]
        delay: u64,
        #[command(flatten)]
        route: Route,
    },
    Cancel {
        id: Hash32,
        #[command(flatten)]
        tier: Tier,
    },
    /// State of one operation.
    Status {
        id: Hash32,
        #[command(flatten)]
        tier: Tier,
    },
    /// Every operation the timelock knows about.
    List {
        #[command(flatten)]
        tier: Tier,
    },
}

#[derive(Subcommand, Debug)]
pub enum LensAction {
    /// Roles held by an account.
    Roles { user: String },
    /// Accounts holding a role.
    Members { role: RoleId },
    CanCall {
        caller: String,
        target: String,
        function: String,
    },
    /// Enabled functions of a target and the roles allowed to call them.
    Capabilities { target: String },
}

pub fn run(command: Command, session: &Session) -> anyhow::Result<()> {
    if let Command::Init = command {
        return init(session);
    }
    session.require_initialised()?;
    match command {
        Command::Init | Command::Genesis => Ok(()),
        Command::Status => status(session),
        Command::Param { action } => param(action, session),
        Command::Authority { action } => authority(action, session),
        Command::Timelock { action } => timelock(action, session),
        Command::Lens { action } => lens(action, session),
    }
}

fn init(session: &Session) -> anyhow::Result<()> {
    if session.is_initialised() {
        bail!("data directory is already initialised");
    }
    let seq = session.commit()?;
    tracing::info!(seq, "genesis deployed");
    println!("genesis deployed");
    Ok(())
}

/// Run a verb and persist whatever it committed, including a change whose
/// post-condition failed.
fn govern(
    session: &Session,
    verb: impl FnOnce(&GovernanceClient) -> Result<Outcome, GovernanceError>,
) -> anyhow::Result<()> {
    let client = session.client()?;
    let result = verb(&client);
    session.commit()?;
    println!("{}", result?);
    Ok(())
}

fn status(session: &Session) -> anyhow::Result<()> {
    let ledger = session.ledger().lock();
    let state = ledger.state();
    println!("seq {}  now {}", ledger.seq(), ledger.now());
    for registry in state.registries() {
        println!(
            "registry {}  owner {}  authority {}",
            registry.address(),
            registry.owner(),
            registry.authority()
        );
    }
    for timelock in state.timelocks() {
        println!(
            "timelock {} {}  min delay {}",
            timelock.label(),
            timelock.address(),
            format_duration(timelock.min_delay())
        );
        for role in TimelockRole::ALL {
            for member in timelock.members(role) {
                println!("  {:<10} {member}", role.name());
            }
        }
    }
    for target in state.targets() {
        println!("target {} {}", target.label(), target.address());
    }
    Ok(())
}

fn param(action: ParamAction, session: &Session) -> anyhow::Result<()> {
    match action {
        ParamAction::List => {
            let client = session.client()?;
            for param in GovernedParam::ALL {
                let value = client
                    .param_value(param)
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                let fast = if param.allows_fast_path() { "  (fast path)" } else { "" };
                println!(
                    "{:<40} {:<20} {value}{fast}",
                    param.name(),
                    param.contract().label()
                );
            }
            Ok(())
        }
        ParamAction::Get { param } => {
            let value = session
                .client()?
                .param_value(param)
                .ok_or_else(|| anyhow!("{param} is not set"))?;
            println!("{value}");
            Ok(())
        }
        ParamAction::Set {
            param,
            value,
            route,
            direct,
        } => {
            let value = param.parse_value(&value)?;
            if direct {
                govern(session, |c| c.set_direct(param, value))
            } else {
                govern(session, |c| c.set(param, value, route.tier(), route.salt))
            }
        }
        ParamAction::FeedSourceAndFeeFloor {
            dynamic_feed,
            fee_floor,
            route,
        } => govern(session, |c| {
            c.collateral_feed_source_and_redemption_fee_floor(
                dynamic_feed,
                fee_floor,
                route.tier(),
                route.salt,
            )
        }),
    }
}

fn authority(action: AuthorityAction, session: &Session) -> anyhow::Result<()> {
    let client = session.client()?;
    let target_and_selector = |target: &str, function: &str| -> anyhow::Result<_> {
        let ledger = session.ledger().lock();
        let target = resolve::contract(ledger.state(), client.contracts(), target)?;
        let selector = resolve::selector(ledger.state(), target, function)?;
        Ok((target, selector))
    };
    match action {
        AuthorityAction::SetRoleName { role, name, salt } => {
            govern(session, |c| c.set_role_name(role, &name, salt.salt))
        }
        AuthorityAction::SetUserRole {
            user,
            role,
            enabled,
            salt,
        } => {
            let user = resolve::account(&user)?;
            govern(session, |c| c.set_user_role(user, role, enabled, salt.salt))
        }
        AuthorityAction::SetRoleCapability {
            role,
            target,
            function,
            enabled,
            salt,
        } => {
            let (target, selector) = target_and_selector(&target, &function)?;
            govern(session, |c| {
                c.set_role_capability(role, target, selector, enabled, salt.salt)
            })
        }
        AuthorityAction::SetPublicCapability {
            target,
            function,
            enabled,
            salt,
        } => {
            let (target, selector) = target_and_selector(&target, &function)?;
            govern(session, |c| {
                c.set_public_capability(target, selector, enabled, salt.salt)
            })
        }
        AuthorityAction::BurnCapability {
            target,
            function,
            salt,
        } => {
            let (target, selector) = target_and_selector(&target, &function)?;
            govern(session, |c| c.burn_capability(target, selector, salt.salt))
        }
        AuthorityAction::SetAuthority { authority, salt } => {
            let authority = resolve::account(&authority)?;
            govern(session, |c| c.set_authority(authority, salt.salt))
        }
    }
}

fn timelock(action: TimelockAction, session: &Session) -> anyhow::Result<()> {
    match action {
        TimelockAction::GrantRole {
            role,
            account,
            route,
        } => {
            let account = resolve::account(&account)?;
            govern(session, |c| {
                c.grant_timelock_role(role, account, route.tier(), route.salt)
            })
        }
        TimelockAction::RevokeRole {
            role,
            account,
            route,
        } => {
            let account = resolve::account(&account)?;
            govern(session, |c| {
                c.revoke_timelock_role(role, account, route.tier(), route.salt)
            })
        }
        TimelockAction::UpdateDelay { delay, route } => govern(session, |c| {
            c.update_timelock_delay(delay, route.tier(), route.salt)
        }),
        TimelockAction::Cancel { id, tier } => {
            govern(session, |c| c.cancel(SecurityTier::from_highsec_flag(tier.highsec), id))
        }
        TimelockAction::Status { id, tier } => {
            let state = session
                .client()?
                .operation_state(SecurityTier::from_highsec_flag(tier.highsec), id)?;
            println!("{state}");
            Ok(())
        }
        TimelockAction::List { tier } => {
            let client = session.client()?;
            let ledger = session.ledger().lock();
            let address = client
                .contracts()
                .timelock(SecurityTier::from_highsec_flag(tier.highsec));
            let timelock = ledger.timelock(address)?;
            let now = ledger.now();
            for op in timelock.operations().iter() {
                let targets: Vec<&str> = op
                    .calls
                    .iter()
                    .map(|c| ledger.state().label_of(c.target).unwrap_or("?"))
                    .collect();
                println!(
                    "{}  {:<9} ready {}  age {}  proposer {}  -> {}",
                    op.id,
                    op.state(now).to_string(),
                    op.ready_at,
                    format_duration(op.age(now)),
                    op.proposer,
                    targets.join(", ")
                );
            }
            Ok(())
        }
    }
}

fn registry<'a>(ledger: &'a Ledger, client: &GovernanceClient) -> anyhow::Result<&'a CapabilityRegistry> {
    ledger
        .state()
        .registry(client.contracts().registry)
        .ok_or_else(|| anyhow!("no capability registry deployed"))
}

fn lens(action: LensAction, session: &Session) -> anyhow::Result<()> {
    let client = session.client()?;
    let ledger = session.ledger().lock();
    let registry = registry(&ledger, &client)?;
    match action {
        LensAction::Roles { user } => {
            for role in registry.roles_of(resolve::account(&user)?) {
                println!("{role}  {}", registry.role_name(role));
            }
        }
        LensAction::Members { role } => {
            for user in registry.users_by_role(role) {
                println!("{user}");
            }
        }
        LensAction::CanCall {
            caller,
            target,
            function,
        } => {
            let caller: Address = resolve::account(&caller)?;
            let target = resolve::contract(ledger.state(), client.contracts(), &target)?;
            let selector = resolve::selector(ledger.state(), target, &function)?;
            println!("{}", ledger.can_call(caller, target, selector));
        }
        LensAction::Capabilities { target } => {
            let target = resolve::contract(ledger.state(), client.contracts(), &target)?;
            for selector in registry.enabled_functions_in_target(target) {
                let name = ledger
                    .state()
                    .target(target)
                    .and_then(|t| t.setter(selector))
                    .map_or_else(|| selector.to_string(), |s| s.signature.clone());
                let roles: Vec<String> = registry
                    .roles_with_capability(target, selector)
                    .iter()
                    .map(|r| r.to_string())
                    .collect();
                let public = if registry.is_public_capability(target, selector) {
                    "  public"
                } else {
                    ""
                };
                println!("{name:<40} roles [{}]{public}", roles.join(", "));
            }
        }
    }
    Ok(())
}
