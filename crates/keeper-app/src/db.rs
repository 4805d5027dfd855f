// SQLite persistence for league facts and keeper records.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keeper_core::model::{
    AcquisitionType, DraftPickRecord, KeeperRecord, KeeperType, Player, PlayerFacts, PlayerId,
    Position, RosterRef, Season, TradedPick, Transaction, TransactionType,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// A bulk import of league history, as produced by a platform sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeagueFacts {
    pub rosters: Vec<RosterRef>,
    pub players: Vec<Player>,
    pub draft_picks: Vec<DraftPickRecord>,
    pub transactions: Vec<Transaction>,
    pub traded_picks: Vec<TradedPick>,
    pub keepers: Vec<KeeperRecord>,
}

/// Everything needed to evaluate one season, read in a single transaction so
/// all players on a roster see the same history.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub season: Season,
    pub rosters: Vec<RosterRef>,
    pub players: HashMap<PlayerId, Player>,
    pub facts: HashMap<PlayerId, PlayerFacts>,
    pub traded_picks: Vec<TradedPick>,
    /// Keeper records for `season` only.
    pub keepers: Vec<KeeperRecord>,
}

impl Snapshot {
    pub fn roster(&self, roster_id: &str) -> Option<&RosterRef> {
        self.rosters.iter().find(|r| r.id == roster_id)
    }

    pub fn roster_keepers(&self, roster_id: &str) -> Vec<KeeperRecord> {
        self.keepers
            .iter()
            .filter(|k| k.roster_id == roster_id)
            .cloned()
            .collect()
    }

    /// Facts for `player_id`; an empty bundle when nothing is recorded.
    pub fn facts_for(&self, player_id: &str) -> PlayerFacts {
        self.facts
            .get(player_id)
            .cloned()
            .unwrap_or_else(|| PlayerFacts::new(player_id))
    }

    pub fn player_names(&self) -> HashMap<PlayerId, String> {
        self.players
            .iter()
            .map(|(id, p)| (id.clone(), p.name.clone()))
            .collect()
    }
}

/// SQLite-backed store for rosters, players, historical facts and keepers.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS rosters (
                id   TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS players (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                position   TEXT NOT NULL,
                team       TEXT,
                age        INTEGER,
                experience INTEGER,
                roster_id  TEXT REFERENCES rosters(id)
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                player_id TEXT NOT NULL,
                roster_id TEXT NOT NULL REFERENCES rosters(id),
                season    INTEGER NOT NULL,
                round     INTEGER NOT NULL,
                PRIMARY KEY (player_id, season)
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                kind           TEXT NOT NULL,
                season         INTEGER NOT NULL,
                timestamp      TEXT NOT NULL,
                player_id      TEXT NOT NULL,
                to_roster_id   TEXT NOT NULL REFERENCES rosters(id),
                from_roster_id TEXT REFERENCES rosters(id),
                UNIQUE(player_id, to_roster_id, timestamp)
            );

            CREATE TABLE IF NOT EXISTS traded_picks (
                season            INTEGER NOT NULL,
                round             INTEGER NOT NULL,
                original_owner_id TEXT NOT NULL REFERENCES rosters(id),
                current_owner_id  TEXT NOT NULL REFERENCES rosters(id),
                PRIMARY KEY (season, round, original_owner_id)
            );

            CREATE TABLE IF NOT EXISTS keepers (
                player_id        TEXT NOT NULL,
                roster_id        TEXT NOT NULL REFERENCES rosters(id),
                season           INTEGER NOT NULL,
                keeper_type      TEXT NOT NULL,
                base_cost        INTEGER NOT NULL,
                final_cost       INTEGER NOT NULL,
                years_kept       INTEGER NOT NULL DEFAULT 0,
                acquisition_type TEXT NOT NULL,
                is_locked        INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (player_id, roster_id, season)
            );

            CREATE INDEX IF NOT EXISTS idx_keepers_roster_season ON keepers(roster_id, season);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_keepers_player_season ON keepers(player_id, season);
            CREATE INDEX IF NOT EXISTS idx_transactions_player ON transactions(player_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Fact upserts
    // ------------------------------------------------------------------

    pub fn upsert_roster(&self, roster: &RosterRef) -> Result<()> {
        let conn = self.conn();
        insert_roster(&conn, roster)
    }

    pub fn upsert_player(&self, player: &Player) -> Result<()> {
        let conn = self.conn();
        insert_player(&conn, player)
    }

    pub fn record_draft_pick(&self, pick: &DraftPickRecord) -> Result<()> {
        let conn = self.conn();
        insert_draft_pick(&conn, pick)
    }

    /// Re-recording the same transaction is a no-op.
    pub fn record_transaction(&self, txn: &Transaction) -> Result<()> {
        let conn = self.conn();
        insert_transaction(&conn, txn)
    }

    /// The latest record for a `(season, round, original owner)` pick wins.
    pub fn record_traded_pick(&self, pick: &TradedPick) -> Result<()> {
        let conn = self.conn();
        insert_traded_pick(&conn, pick)
    }

    /// Import a full fact bundle in a single transaction. Rosters go first so
    /// foreign keys resolve.
    pub fn import_facts(&self, facts: &LeagueFacts) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for roster in &facts.rosters {
            insert_roster(&tx, roster)?;
        }
        for player in &facts.players {
            insert_player(&tx, player)?;
        }
        for pick in &facts.draft_picks {
            insert_draft_pick(&tx, pick)?;
        }
        for txn in &facts.transactions {
            insert_transaction(&tx, txn)?;
        }
        for pick in &facts.traded_picks {
            insert_traded_pick(&tx, pick)?;
        }
        for keeper in &facts.keepers {
            insert_keeper(&tx, keeper)?;
        }

        tx.commit().context("failed to commit import")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Load every fact needed to evaluate `season` in one read transaction.
    pub fn load_snapshot(&self, season: Season) -> Result<Snapshot> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin snapshot transaction")?;

        let rosters = query_all(&tx, "SELECT id, name FROM rosters ORDER BY id", [], |row| {
            Ok(RosterRef {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load rosters")?;

        let players = query_all(
            &tx,
            "SELECT id, name, position, team, age, experience, roster_id FROM players",
            [],
            player_from_row,
        )
        .context("failed to load players")?;

        let draft_picks = query_all(
            &tx,
            "SELECT player_id, roster_id, season, round FROM draft_picks ORDER BY season",
            [],
            |row| {
                Ok(DraftPickRecord {
                    player_id: row.get(0)?,
                    roster_id: row.get(1)?,
                    season: row.get(2)?,
                    round: row.get(3)?,
                })
            },
        )
        .context("failed to load draft picks")?;

        let transactions = query_all(
            &tx,
            "SELECT kind, season, timestamp, player_id, to_roster_id, from_roster_id
             FROM transactions ORDER BY timestamp",
            [],
            transaction_from_row,
        )
        .context("failed to load transactions")?;

        let traded_picks = query_all(
            &tx,
            "SELECT season, round, original_owner_id, current_owner_id
             FROM traded_picks WHERE season = ?1",
            params![season],
            |row| {
                Ok(TradedPick {
                    season: row.get(0)?,
                    round: row.get(1)?,
                    original_owner_id: row.get(2)?,
                    current_owner_id: row.get(3)?,
                })
            },
        )
        .context("failed to load traded picks")?;

        let all_keepers = query_all(&tx, &format!("{KEEPER_SELECT} ORDER BY season, roster_id, player_id"), [], keeper_from_row)
            .context("failed to load keepers")?;

        tx.commit().context("failed to finish snapshot transaction")?;

        let mut facts: HashMap<PlayerId, PlayerFacts> = HashMap::new();
        for pick in draft_picks {
            facts_entry(&mut facts, &pick.player_id).draft_picks.push(pick);
        }
        for txn in transactions {
            facts_entry(&mut facts, &txn.player_id).transactions.push(txn);
        }
        let mut keepers = Vec::new();
        for keeper in all_keepers {
            if keeper.season == season {
                keepers.push(keeper.clone());
            }
            facts_entry(&mut facts, &keeper.player_id).keeper_history.push(keeper);
        }

        Ok(Snapshot {
            season,
            rosters,
            players: players.into_iter().map(|p| (p.id.clone(), p)).collect(),
            facts,
            traded_picks,
            keepers,
        })
    }

    // ------------------------------------------------------------------
    // Keepers
    // ------------------------------------------------------------------

    /// Keeper records for one roster and season, ordered by player id.
    pub fn load_roster_keepers(&self, roster_id: &str, season: Season) -> Result<Vec<KeeperRecord>> {
        let conn = self.conn();
        query_all(
            &conn,
            &format!("{KEEPER_SELECT} WHERE roster_id = ?1 AND season = ?2 ORDER BY player_id"),
            params![roster_id, season],
            keeper_from_row,
        )
        .context("failed to load roster keepers")
    }

    /// Replace a roster's keeper set for `season` atomically.
    pub fn replace_roster_keepers(&self, roster_id: &str, season: Season, keepers: &[KeeperRecord]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin keeper transaction")?;
        tx.execute(
            "DELETE FROM keepers WHERE roster_id = ?1 AND season = ?2",
            params![roster_id, season],
        )
        .context("failed to clear roster keepers")?;
        for keeper in keepers {
            insert_keeper(&tx, keeper)?;
        }
        tx.commit().context("failed to commit keeper replacement")?;
        Ok(())
    }

    /// Delete one keeper record. Returns `false` when no such keeper exists.
    pub fn delete_keeper(&self, player_id: &str, roster_id: &str, season: Season) -> Result<bool> {
        let conn = self.conn();
        let deleted = conn
            .execute(
                "DELETE FROM keepers WHERE player_id = ?1 AND roster_id = ?2 AND season = ?3",
                params![player_id, roster_id, season],
            )
            .context("failed to delete keeper")?;
        Ok(deleted > 0)
    }

    /// Set the commissioner lock. Returns `false` when no such keeper exists.
    pub fn set_locked(&self, player_id: &str, roster_id: &str, season: Season, locked: bool) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE keepers SET is_locked = ?1 WHERE player_id = ?2 AND roster_id = ?3 AND season = ?4",
                params![locked, player_id, roster_id, season],
            )
            .context("failed to update keeper lock")?;
        Ok(changed > 0)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

const KEEPER_SELECT: &str = "SELECT player_id, roster_id, season, keeper_type, base_cost, final_cost,
        years_kept, acquisition_type, is_locked FROM keepers";

fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("failed to prepare query: {sql}"))?;
    let rows = stmt
        .query_map(params, map)
        .context("failed to run query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map rows")?;
    Ok(rows)
}

fn facts_entry<'a>(facts: &'a mut HashMap<PlayerId, PlayerFacts>, player_id: &str) -> &'a mut PlayerFacts {
    facts
        .entry(player_id.to_string())
        .or_insert_with(|| PlayerFacts::new(player_id))
}

fn bad_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    let position: String = row.get(2)?;
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        position: Position::from_str_pos(&position)
            .ok_or_else(|| bad_column(2, format!("unknown position `{position}`")))?,
        team: row.get(3)?,
        age: row.get(4)?,
        experience: row.get(5)?,
        roster_id: row.get(6)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind: String = row.get(0)?;
    let timestamp: String = row.get(2)?;
    Ok(Transaction {
        kind: TransactionType::from_label(&kind)
            .ok_or_else(|| bad_column(0, format!("unknown transaction type `{kind}`")))?,
        season: row.get(1)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| bad_column(2, format!("bad timestamp `{timestamp}`: {e}")))?
            .with_timezone(&Utc),
        player_id: row.get(3)?,
        to_roster_id: row.get(4)?,
        from_roster_id: row.get(5)?,
    })
}

fn keeper_from_row(row: &Row<'_>) -> rusqlite::Result<KeeperRecord> {
    let keeper_type: String = row.get(3)?;
    let acquisition: String = row.get(7)?;
    Ok(KeeperRecord {
        player_id: row.get(0)?,
        roster_id: row.get(1)?,
        season: row.get(2)?,
        keeper_type: KeeperType::from_label(&keeper_type)
            .ok_or_else(|| bad_column(3, format!("unknown keeper type `{keeper_type}`")))?,
        base_cost: row.get(4)?,
        final_cost: row.get(5)?,
        years_kept: row.get(6)?,
        acquisition_type: AcquisitionType::from_label(&acquisition)
            .ok_or_else(|| bad_column(7, format!("unknown acquisition type `{acquisition}`")))?,
        is_locked: row.get(8)?,
    })
}

fn insert_roster(conn: &Connection, roster: &RosterRef) -> Result<()> {
    conn.execute(
        "INSERT INTO rosters (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![roster.id, roster.name],
    )
    .with_context(|| format!("failed to upsert roster {}", roster.id))?;
    Ok(())
}

fn insert_player(conn: &Connection, player: &Player) -> Result<()> {
    conn.execute(
        "INSERT INTO players (id, name, position, team, age, experience, roster_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            name       = excluded.name,
            position   = excluded.position,
            team       = excluded.team,
            age        = excluded.age,
            experience = excluded.experience,
            roster_id  = excluded.roster_id",
        params![
            player.id,
            player.name,
            player.position.display_str(),
            player.team,
            player.age,
            player.experience,
            player.roster_id,
        ],
    )
    .with_context(|| format!("failed to upsert player {}", player.id))?;
    Ok(())
}

fn insert_draft_pick(conn: &Connection, pick: &DraftPickRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO draft_picks (player_id, roster_id, season, round)
         VALUES (?1, ?2, ?3, ?4)",
        params![pick.player_id, pick.roster_id, pick.season, pick.round],
    )
    .context("failed to record draft pick")?;
    Ok(())
}

fn insert_transaction(conn: &Connection, txn: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO transactions
            (kind, season, timestamp, player_id, to_roster_id, from_roster_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            txn.kind.label(),
            txn.season,
            txn.timestamp.to_rfc3339(),
            txn.player_id,
            txn.to_roster_id,
            txn.from_roster_id,
        ],
    )
    .context("failed to record transaction")?;
    Ok(())
}

fn insert_traded_pick(conn: &Connection, pick: &TradedPick) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO traded_picks (season, round, original_owner_id, current_owner_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![pick.season, pick.round, pick.original_owner_id, pick.current_owner_id],
    )
    .context("failed to record traded pick")?;
    Ok(())
}

fn insert_keeper(conn: &Connection, keeper: &KeeperRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO keepers
            (player_id, roster_id, season, keeper_type, base_cost, final_cost,
             years_kept, acquisition_type, is_locked)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(player_id, roster_id, season) DO UPDATE SET
            keeper_type      = excluded.keeper_type,
            base_cost        = excluded.base_cost,
            final_cost       = excluded.final_cost,
            years_kept       = excluded.years_kept,
            acquisition_type = excluded.acquisition_type,
            is_locked        = excluded.is_locked",
        params![
            keeper.player_id,
            keeper.roster_id,
            keeper.season,
            keeper.keeper_type.label(),
            keeper.base_cost,
            keeper.final_cost,
            keeper.years_kept,
            keeper.acquisition_type.label(),
            keeper.is_locked,
        ],
    )
    .with_context(|| format!("failed to write keeper {}", keeper.player_id))?;
    Ok(())
}
