//! Corrections for data standard 2.0 table shapes.

use metaed_core::plugin::{run_diminisher, Patch};
use metaed_core::{EnhancerResult, MetaEdEnvironment};

use crate::model::{Table, TableRepository};
use crate::PLUGIN_NAME;

const ENHANCER_NAME: &str = "RemoveGradingPeriodRoleNameFromSchoolId";
const CORE_NAMESPACE: &str = "EdFi";
const GRADING_PERIOD_SCHOOL_ID: &str = "GradingPeriodSchoolId";
const SCHOOL_ID: &str = "SchoolId";

/// Tables whose `GradingPeriodSchoolId` column becomes `SchoolId`.
const RENAMED_IN: &[&str] = &[
    "ReportCard",
    "ReportCardStudentCompetencyObjective",
    "ReportCardStudentLearningObjective",
    "StudentAcademicRecordReportCard",
];

/// Tables that already carry `SchoolId` and drop the role-named copy.
const REMOVED_FROM: &[&str] = &["ReportCardGrade"];

fn rename(column_id: &mut String) {
    if column_id == GRADING_PERIOD_SCHOOL_ID {
        *column_id = SCHOOL_ID.to_string();
    }
}

fn patch_table(table: &mut Table, remove: bool) {
    if remove || table.column(SCHOOL_ID).is_some() {
        table.columns.retain(|c| c.column_id != GRADING_PERIOD_SCHOOL_ID);
    } else {
        for column in &mut table.columns {
            rename(&mut column.column_id);
        }
    }
    for foreign_key in &mut table.foreign_keys {
        for pair in &mut foreign_key.column_pairs {
            rename(&mut pair.parent_table_column_id);
            rename(&mut pair.foreign_table_column_id);
        }
    }
}

fn patch(metaed: &mut MetaEdEnvironment) -> anyhow::Result<Patch> {
    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    let Ok(repository) = environment.namespace_data_mut::<TableRepository>(CORE_NAMESPACE) else {
        return Ok(Patch::TargetNotFound);
    };

    let mut patched = 0;
    for (table_ids, remove) in [(RENAMED_IN, false), (REMOVED_FROM, true)] {
        for table_id in table_ids {
            if let Some(table) = repository.get_mut(table_id) {
                patch_table(table, remove);
                patched += 1;
            }
        }
    }
    tracing::debug!(patched, "grading period school id tables");
    Ok(if patched == 0 {
        Patch::TargetNotFound
    } else {
        Patch::Applied
    })
}

pub fn remove_grading_period_role_name_from_school_id(
    metaed: &mut MetaEdEnvironment,
) -> anyhow::Result<EnhancerResult> {
    run_diminisher(metaed, ENHANCER_NAME, "2.0.x", patch)
}
