// SPDX-License-Identifier: MIT

//! Storage role routine (spec.md §9 supplement): report-only reconciliation
//! of S3 buckets. No object-storage SDK is in scope, so this never creates
//! or deletes a bucket — it only checks for an existence marker file under
//! the configured storage metadata root and reports when one is missing.

use std::path::Path;

use nodeagent_core::{DesiredS3Bucket, DriftEvent, DriftKind};

use super::RoleContext;

pub async fn reconcile_storage(ctx: &RoleContext<'_>, buckets: &[DesiredS3Bucket], storage_metadata_root: &Path) -> Vec<DriftEvent> {
    let mut events = Vec::new();

    for bucket in buckets {
        let _guard = ctx.locks.lock("storage", &bucket.tenant_id, &bucket.name).await;

        let marker = storage_metadata_root.join(&bucket.tenant_id).join(format!("{}.bucket", bucket.name));
        if marker.is_file() {
            continue;
        }

        let resource = format!("{}/{}", bucket.tenant_id, bucket.name);
        events.push(ctx.reported(DriftKind::Storage, resource, "s3 bucket marker missing; storage reconciliation is report-only"));
    }

    events
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
