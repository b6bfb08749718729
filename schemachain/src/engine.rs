//! Applying registered migration groups against the stored schema version.

use crate::error::Error;
use crate::executor::Executor;
use crate::helper::DbHelper;
use crate::migration::MigrationGroup;
use crate::version::{save_version, VERSION_SENTINEL};

/// A statement that failed during [DbHelper::run_update] without stopping the run.
#[derive(Debug, PartialEq)]
pub struct StatementFailure {
    pub group: String,
    pub version: f32,
    pub error: Error,
}

/// A report of actions performed by [DbHelper::run_update].
#[derive(Debug, PartialEq)]
pub struct UpdateReport {
    /// The version the run compared statements against.
    pub previous_version: f32,
    /// The version stored after the run.
    pub new_version: f32,
    pub statements_run: usize,
    pub failures: Vec<StatementFailure>,
}

impl<E: Executor> DbHelper<E> {
    /// Run every registered statement newer than the stored schema version.
    ///
    /// Groups run in ascending `order`, statements within a group in ascending version, both
    /// keeping registration order for ties. `full_update` ignores the stored version and runs
    /// everything. `drop_all_tables` is accepted for compatibility and has no effect.
    ///
    /// With `stop_on_error` the first failure is returned and the stored version is untouched.
    /// Otherwise failures are collected in the report and the new version is stored anyway,
    /// unless `advance_version_on_failure` is off.
    pub fn run_update(
        &mut self,
        full_update: bool,
        drop_all_tables: bool,
    ) -> Result<UpdateReport, Error> {
        if !self.options.store_version_in_db {
            return self.handle(None, Err(Error::CannotStoreVersion), || UpdateReport {
                previous_version: self.current_version,
                new_version: self.current_version,
                statements_run: 0,
                failures: Vec::new(),
            });
        }
        if drop_all_tables {
            #[cfg(feature = "tracing")]
            tracing::warn!("drop_all_tables is not supported and is ignored");
        }

        let previous_version = if full_update {
            VERSION_SENTINEL
        } else {
            self.current_version
        };

        let mut groups: Vec<MigrationGroup> = self.groups.clone();
        groups.sort_by_key(|g| g.order);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            current_version = previous_version,
            full_update = full_update,
            groups = ?groups.iter().map(|g| (g.order, g.name.as_str())).collect::<Vec<_>>(),
            "Considering migration groups"
        );

        let mut new_version = previous_version;
        let mut statements_run = 0;
        let mut failures = Vec::new();

        for group in &groups {
            #[cfg(feature = "tracing")]
            let _span =
                tracing::info_span!("migration_group", name = %group.name, order = group.order)
                    .entered();

            for statement in group.sorted_statements() {
                if statement.version_added <= previous_version || statement.is_empty() {
                    continue;
                }
                if statement.version_added > new_version {
                    new_version = statement.version_added;
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(version = statement.version_added, "Running statement");

                match self.exec_statement(statement) {
                    Ok(_) => statements_run += 1,
                    Err(error) => {
                        #[cfg(feature = "tracing")]
                        tracing::error!(
                            error = %error,
                            version = statement.version_added,
                            "Migration statement failed"
                        );
                        if self.options.stop_on_error {
                            return Err(error);
                        }
                        failures.push(StatementFailure {
                            group: group.name.clone(),
                            version: statement.version_added,
                            error,
                        });
                    }
                }
            }
        }

        if !failures.is_empty() && !self.options.advance_version_on_failure {
            #[cfg(feature = "tracing")]
            tracing::info!(
                failures = failures.len(),
                version = self.current_version,
                "Keeping schema version after failed statements"
            );
            return Ok(UpdateReport {
                previous_version,
                new_version: self.current_version,
                statements_run,
                failures,
            });
        }

        let table = self.options.version_table.clone();
        let saved = save_version(&mut self.conn, self.dialect, &table, new_version);
        self.handle(None, saved, || ())?;
        self.current_version = new_version;

        #[cfg(feature = "tracing")]
        tracing::info!(
            previous_version = previous_version,
            new_version = new_version,
            statements_run = statements_run,
            failures = failures.len(),
            "Schema update finished"
        );

        Ok(UpdateReport {
            previous_version,
            new_version,
            statements_run,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::helper::HelperOptions;
    use crate::hook::ErrHookOptions;
    use crate::testing::RecordingExecutor;

    fn helper(exec: RecordingExecutor, options: HelperOptions) -> DbHelper<RecordingExecutor> {
        DbHelper::new(Dialect::Mysql, exec, options).unwrap()
    }

    #[test]
    fn groups_then_versions_in_order() {
        let mut db = helper(RecordingExecutor::new(), HelperOptions::default());
        db.add_group(MigrationGroup::new("second", 2).add(3.0, "c").add(1.0, "a"))
            .add_group(MigrationGroup::new("first", 1).add(2.0, "b"));
        let report = db.run_update(false, false).unwrap();
        assert_eq!(db.connection().sql(), vec!["b", "a", "c"]);
        assert_eq!(report.previous_version, VERSION_SENTINEL);
        assert_eq!(report.new_version, 3.0);
        assert_eq!(report.statements_run, 3);
        assert_eq!(db.current_version(), 3.0);
    }

    #[test]
    fn only_newer_statements_run() {
        let exec = RecordingExecutor::new().with_stored_version(1.0);
        let mut db = helper(exec, HelperOptions::default());
        assert_eq!(db.current_version(), 1.0);
        db.add_group(
            MigrationGroup::new("g", 0)
                .add(1.0, "v1")
                .add(2.0, "v2")
                .add(3.0, "v3"),
        );
        db.run_update(false, false).unwrap();
        assert_eq!(db.connection().sql(), vec!["v2", "v3"]);
        assert_eq!(db.connection().stored_version(), Some(3.0));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut db = helper(RecordingExecutor::new(), HelperOptions::default());
        db.add_group(MigrationGroup::new("g", 0).add(1.0, "v1"));
        db.run_update(false, false).unwrap();
        let report = db.run_update(false, false).unwrap();
        assert_eq!(report.statements_run, 0);
        assert_eq!(report.new_version, 1.0);
        assert_eq!(db.connection().sql(), vec!["v1"]);
    }

    #[test]
    fn stop_on_error_keeps_stored_version() {
        let exec = RecordingExecutor::new().fail_on("bad");
        let options = HelperOptions::default().stop_on_error(true);
        let mut db = helper(exec, options);
        db.add_group(
            MigrationGroup::new("g", 0)
                .add(1.0, "ok")
                .add(2.0, "bad")
                .add(3.0, "never"),
        );
        assert!(db.run_update(false, false).is_err());
        assert_eq!(db.connection().sql(), vec!["ok", "bad"]);
        assert_eq!(db.connection().stored_version(), Some(f64::from(VERSION_SENTINEL)));
        assert_eq!(db.current_version(), VERSION_SENTINEL);
    }

    #[test]
    fn failures_are_reported_and_version_advances() {
        let mut db = helper(
            RecordingExecutor::new().fail_on("bad"),
            HelperOptions::default(),
        );
        db.add_group(
            MigrationGroup::new("g", 0)
                .add(1.0, "ok")
                .add(2.0, "bad")
                .add(3.0, "after"),
        );
        let report = db.run_update(false, false).unwrap();
        assert_eq!(report.statements_run, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].group, "g");
        assert_eq!(report.failures[0].version, 2.0);
        assert_eq!(report.new_version, 3.0);
        assert_eq!(db.connection().stored_version(), Some(3.0));
    }

    #[test]
    fn failures_can_hold_the_version_back() {
        let options = HelperOptions::default().advance_version_on_failure(false);
        let mut db = helper(RecordingExecutor::new().fail_on("bad"), options);
        db.add_group(MigrationGroup::new("g", 0).add(1.0, "ok").add(2.0, "bad"));
        let report = db.run_update(false, false).unwrap();
        assert_eq!(report.new_version, VERSION_SENTINEL);
        assert_eq!(db.current_version(), VERSION_SENTINEL);
        assert_eq!(db.connection().stored_version(), Some(f64::from(VERSION_SENTINEL)));
    }

    #[test]
    fn requires_version_storage() {
        let options = HelperOptions::default().store_version_in_db(false);
        let mut db = helper(RecordingExecutor::new(), options);
        db.add_group(MigrationGroup::new("g", 0).add(1.0, "v1"));
        assert_eq!(db.run_update(false, false), Err(Error::CannotStoreVersion));
        assert!(db.connection().statements().is_empty());
    }

    #[test]
    fn templates_and_empty_statements() {
        let mut db = helper(RecordingExecutor::new(), HelperOptions::default());
        db.add_group(
            MigrationGroup::new("g", 0)
                .add(1.0, "")
                .add_templated(2.0, "CREATE TABLE %s (id INT)", vec!["t".to_string()]),
        );
        let report = db.run_update(false, false).unwrap();
        assert_eq!(db.connection().sql(), vec!["CREATE TABLE t (id INT)"]);
        assert_eq!(report.statements_run, 1);
        assert_eq!(report.new_version, 2.0);
    }

    #[test]
    fn full_update_reruns_everything() {
        let exec = RecordingExecutor::new().with_stored_version(5.0);
        let mut db = helper(exec, HelperOptions::default());
        db.add_group(MigrationGroup::new("g", 0).add(0.0, "init").add(1.0, "v1"));
        assert_eq!(db.run_update(false, false).unwrap().statements_run, 0);
        let report = db.run_update(true, true).unwrap();
        assert_eq!(report.previous_version, VERSION_SENTINEL);
        assert_eq!(db.connection().sql(), vec!["init", "v1"]);
        assert_eq!(report.new_version, 1.0);
    }

    #[test]
    fn suppressed_errors_count_as_run() {
        let mut db = helper(
            RecordingExecutor::new().fail_on("bad"),
            HelperOptions::default().stop_on_error(true),
        )
        .on_error(|_| {}, ErrHookOptions::suppress());
        db.add_group(MigrationGroup::new("g", 0).add(1.0, "bad").add(2.0, "ok"));
        let report = db.run_update(false, false).unwrap();
        assert_eq!(report.statements_run, 2);
        assert!(report.failures.is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_chain_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let path = path.to_str().unwrap();
        {
            let mut db = DbHelper::open_sqlite(path, HelperOptions::default()).unwrap();
            db.add_group(
                MigrationGroup::new("users", 0)
                    .add(0.0, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
                    .add_with_params(
                        1.0,
                        "INSERT INTO users (name) VALUES (?)",
                        vec!["alice".to_string()],
                    ),
            );
            db.run_update(false, false).unwrap();
        }
        let mut db = DbHelper::open_sqlite(path, HelperOptions::default()).unwrap();
        assert_eq!(db.current_version(), 1.0);
        assert_eq!(
            db.query_scalar("SELECT name FROM users", &[]).unwrap(),
            Some(crate::executor::Param::Text("alice".to_string()))
        );
    }
}
