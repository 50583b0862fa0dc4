//! Reward commands: add, list, claim and remove rewards.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use tempo_core::ledger;
use tempo_core::{ClaimOutcome, LedgerStore, RewardId};
use tempo_db::{Database, RewardRecord};

#[derive(Debug, Subcommand)]
pub enum RewardAction {
    /// Add a reward.
    Add {
        /// Reward name.
        name: String,

        /// Points needed to claim it.
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
        cost: i64,
    },

    /// List rewards and whether they are unlocked.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Spend points on a reward.
    Claim {
        /// Reward ID.
        id: RewardId,
    },

    /// Delete a reward. Past claims are kept.
    Rm {
        /// Reward ID.
        id: RewardId,
    },
}

#[derive(Debug, Serialize)]
struct RewardList<'a> {
    unlocked: bool,
    balance: i64,
    rewards: &'a [RewardRecord],
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: &RewardAction,
    today: NaiveDate,
) -> Result<()> {
    match action {
        RewardAction::Add { name, cost } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("reward name cannot be empty");
            }
            let id = db.add_reward(name, *cost)?;
            writeln!(writer, "Added reward {id}: {name} ({cost} points)")?;
        }
        RewardAction::List { json } => {
            let rewards = db.list_rewards()?;
            let list = RewardList {
                unlocked: ledger::can_unlock_rewards(&*db)?,
                balance: db.balance()?,
                rewards: &rewards,
            };
            if *json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&list)?)?;
            } else {
                write_list(writer, &list)?;
            }
        }
        RewardAction::Claim { id } => claim(writer, db, *id, today)?,
        RewardAction::Rm { id } => {
            if !db.delete_reward(*id)? {
                bail!("reward not found: {id}");
            }
            writeln!(writer, "Deleted reward {id}")?;
        }
    }
    Ok(())
}

fn claim<W: Write>(writer: &mut W, db: &mut Database, id: RewardId, today: NaiveDate) -> Result<()> {
    if !ledger::can_unlock_rewards(&*db)? {
        bail!("rewards are locked until your top-3 tasks are done");
    }
    let name = db
        .list_rewards()?
        .into_iter()
        .find(|reward| reward.id == id)
        .map(|reward| reward.name)
        .with_context(|| format!("reward not found: {id}"))?;

    match ledger::claim_reward(db, id, today)? {
        ClaimOutcome::Claimed { cost, balance } => {
            writeln!(
                writer,
                "Claimed {name} for {cost} points (balance {balance})"
            )?;
        }
        ClaimOutcome::InsufficientBalance { cost, balance } => {
            bail!("not enough points for {name}: costs {cost}, balance is {balance}");
        }
        ClaimOutcome::UnknownReward => bail!("reward not found: {id}"),
    }
    Ok(())
}

fn write_list<W: Write>(writer: &mut W, list: &RewardList<'_>) -> Result<()> {
    let state = if list.unlocked {
        "unlocked"
    } else {
        "locked until top-3 tasks are done"
    };
    writeln!(writer, "Rewards: {state}")?;
    writeln!(writer, "Balance: {} points", list.balance)?;
    if list.rewards.is_empty() {
        writeln!(writer, "No rewards yet. Add one with `tempo reward add <name> --cost <points>`.")?;
        return Ok(());
    }
    for reward in list.rewards {
        let marker = if list.unlocked && reward.points_cost <= list.balance {
            "  (claimable)"
        } else {
            ""
        };
        writeln!(
            writer,
            "{:<4}  {} - {} points{marker}",
            reward.id, reward.name, reward.points_cost
        )?;
    }
    Ok(())
}
