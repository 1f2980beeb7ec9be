//! Relation sync commands
//!
//! Usage:
//!   bank-reports sync set <RELATION> <OWNER_ID> --target <ID>...
//!   bank-reports sync set <RELATION> <OWNER_ID> --clear
//!   bank-reports sync show <ENTITY> <ID>

use anyhow::bail;
use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

use domain_banking::{DesiredRelations, EntityKind, RelationKind, RelationshipSynchronizer};

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommand,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Replace one relation set of an aggregate
    Set(SetArgs),
    /// Print an aggregate with its relation sets as JSON
    Show {
        #[arg(value_enum)]
        entity: EntityArg,
        id: Uuid,
    },
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(value_enum)]
    pub relation: RelationArg,

    /// Id of the owning aggregate
    pub owner_id: Uuid,

    /// Target id; repeat for several
    #[arg(short, long = "target", conflicts_with = "clear")]
    pub targets: Vec<Uuid>,

    /// Remove every target instead
    #[arg(long)]
    pub clear: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RelationArg {
    /// Deposits held by a client
    ClientDeposits,
    /// Credit programs taken by a client
    ClientCreditPrograms,
    /// Currencies of a deposit
    DepositCurrencies,
    /// Currencies of a credit program
    CreditProgramCurrencies,
}

impl From<RelationArg> for RelationKind {
    fn from(arg: RelationArg) -> Self {
        match arg {
            RelationArg::ClientDeposits => RelationKind::DepositClient,
            RelationArg::ClientCreditPrograms => RelationKind::ClientCreditProgram,
            RelationArg::DepositCurrencies => RelationKind::DepositCurrency,
            RelationArg::CreditProgramCurrencies => RelationKind::CreditProgramCurrency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    Client,
    Deposit,
    CreditProgram,
    Currency,
}

impl From<EntityArg> for EntityKind {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::Client => EntityKind::Client,
            EntityArg::Deposit => EntityKind::Deposit,
            EntityArg::CreditProgram => EntityKind::CreditProgram,
            EntityArg::Currency => EntityKind::Currency,
        }
    }
}

/// Runs a sync command and returns the JSON to print
pub async fn execute(args: SyncArgs, synchronizer: &RelationshipSynchronizer) -> anyhow::Result<String> {
    match args.command {
        SyncCommand::Set(set) => {
            let kind = RelationKind::from(set.relation);
            let desired = desired_relations(kind, set.targets, set.clear)?;

            let outcome = synchronizer
                .update_relations(kind.owner(), set.owner_id, desired)
                .await?;

            tracing::info!(
                relation = %kind,
                owner_id = %set.owner_id,
                inserted = outcome.inserted_count(),
                deleted = outcome.deleted_count(),
                "Relation set synchronized"
            );
            Ok(serde_json::to_string_pretty(&outcome)?)
        }
        SyncCommand::Show { entity, id } => {
            let record = synchronizer.get_element(entity.into(), id).await?;
            Ok(serde_json::to_string_pretty(&record)?)
        }
    }
}

/// An empty target list only clears when asked to explicitly
fn desired_relations(kind: RelationKind, targets: Vec<Uuid>, clear: bool) -> anyhow::Result<DesiredRelations> {
    if clear {
        return Ok(DesiredRelations::new().clear(kind));
    }
    if targets.is_empty() {
        bail!("no targets given for {kind}; pass --clear to remove every target");
    }
    Ok(DesiredRelations::new().set(kind, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_args_map_to_owned_kinds() {
        assert_eq!(RelationKind::from(RelationArg::ClientDeposits).owner(), EntityKind::Client);
        assert_eq!(
            RelationKind::from(RelationArg::CreditProgramCurrencies).owner(),
            EntityKind::CreditProgram
        );
    }

    #[test]
    fn test_empty_targets_need_clear_flag() {
        assert!(desired_relations(RelationKind::DepositCurrency, vec![], false).is_err());

        let cleared = desired_relations(RelationKind::DepositCurrency, vec![], true).unwrap();
        assert_eq!(cleared.get(RelationKind::DepositCurrency), Some(&[][..]));
    }

    #[test]
    fn test_targets_become_the_desired_set() {
        let target = Uuid::new_v4();
        let desired = desired_relations(RelationKind::DepositClient, vec![target], false).unwrap();

        assert_eq!(desired.get(RelationKind::DepositClient), Some(&[target][..]));
        assert_eq!(desired.kinds().count(), 1);
    }
}
