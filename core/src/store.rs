//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine calls store methods; subsystems never see the connection.

use rusqlite::{params, Connection};
use crate::{
    error::SimResult,
    event::EventLogEntry,
    stats::{FrameStats, HealthcareStatus},
    trace::TraceNode,
    types::Frame,
};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the simulation database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str, population: usize) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, population, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                seed as i64,
                version,
                population as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, frame, subsystem, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.frame as i64,
                entry.subsystem,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_frame(&self, run_id: &str, frame: Frame) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, frame, subsystem, event_type, payload
             FROM event_log WHERE run_id = ?1 AND frame = ?2
             ORDER BY id ASC"
        )?;
        let entries = stmt.query_map(params![run_id, frame as i64], |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                run_id:     row.get(1)?,
                frame:      row.get::<_, i64>(2)? as u64,
                subsystem:  row.get(3)?,
                event_type: row.get(4)?,
                payload:    row.get(5)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count_by_type(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Frame stats ────────────────────────────────────────────

    pub fn insert_frame_stats(&self, run_id: &str, stats: &FrameStats) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO frame_stats
               (run_id, frame, healthy, infected, recovered, dead,
                hospitalized, cumulative_infected, healthcare_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                stats.frame as i64,
                stats.healthy as i64,
                stats.infected as i64,
                stats.recovered as i64,
                stats.dead as i64,
                stats.hospitalized as i64,
                stats.cumulative_infected as i64,
                serde_json::to_string(&stats.healthcare_status)?,
            ],
        )?;
        Ok(())
    }

    pub fn frame_stats(&self, run_id: &str) -> SimResult<Vec<FrameStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT frame, healthy, infected, recovered, dead,
                    hospitalized, cumulative_infected, healthcare_status
             FROM frame_stats WHERE run_id = ?1
             ORDER BY frame ASC"
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                FrameStats {
                    frame:               row.get::<_, i64>(0)? as u64,
                    healthy:             row.get::<_, i64>(1)? as usize,
                    infected:            row.get::<_, i64>(2)? as usize,
                    recovered:           row.get::<_, i64>(3)? as usize,
                    dead:                row.get::<_, i64>(4)? as usize,
                    hospitalized:        row.get::<_, i64>(5)? as usize,
                    cumulative_infected: row.get::<_, i64>(6)? as usize,
                    healthcare_status:   HealthcareStatus::Normal,
                },
                row.get::<_, String>(7)?,
            ))
        })?.collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut stats, status)| -> SimResult<FrameStats> {
                stats.healthcare_status = serde_json::from_str(&status)?;
                Ok(stats)
            })
            .collect()
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, run_id: &str, frame: Frame, state_json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot (run_id, frame, state_json) VALUES (?1, ?2, ?3)",
            params![run_id, frame as i64, state_json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot_before(
        &self, run_id: &str, frame: Frame
    ) -> SimResult<Option<(Frame, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT frame, state_json FROM snapshot
             WHERE run_id = ?1 AND frame <= ?2
             ORDER BY frame DESC LIMIT 1"
        )?;
        let result = stmt.query_row(params![run_id, frame as i64], |row| {
            Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?))
        }).ok();
        Ok(result)
    }

    // ── Transmission tree ──────────────────────────────────────

    /// Replace the stored tree for `run_id` with `nodes`.
    /// Roots are stored with `infected_by = person_id`.
    pub fn save_transmission_tree(&self, run_id: &str, nodes: &[TraceNode]) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM transmission_edge WHERE run_id = ?1", params![run_id])?;
        for node in nodes {
            let (id, by) = match node {
                TraceNode::Root { id, .. } => (*id, *id),
                TraceNode::Edge { id, infected_by, .. } => (*id, *infected_by),
            };
            tx.execute(
                "INSERT INTO transmission_edge (run_id, person_id, infected_by, state)
                 VALUES (?1, ?2, ?3, ?4)",
                params![run_id, id as i64, by as i64, serde_json::to_string(&node.state())?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn transmission_edge_count(&self, run_id: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM transmission_edge WHERE run_id = ?1 AND person_id != infected_by",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
