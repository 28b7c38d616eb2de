//! First-run provisioning: bootstrap admin account and, for the in-memory
//! backend, a small demo dataset so the console is browsable out of the box.

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::AdminConfig;
use crate::shared::models::{
    DocumentType, NewDocument, NewOtherDocType, NewProcess, NewSubprocess, NewUser,
    ProcessCategory,
};
use crate::storage::Storage;

/// Creates the admin account from config when the user table is empty.
pub async fn ensure_admin(storage: &dyn Storage, admin: &AdminConfig) -> Result<()> {
    if storage.count_users().await? > 0 {
        return Ok(());
    }
    let user = storage
        .create_user(NewUser {
            username: admin.username.clone(),
            password: hash_password(&admin.password)?,
            full_name: admin.full_name.clone(),
            is_admin: true,
            kpi_iframe_url: None,
        })
        .await?;
    info!(username = %user.username, "bootstrap admin created");
    Ok(())
}

/// Seeds sample processes, subprocesses, and documents. Only called for the
/// in-memory backend, and only when no processes exist yet.
pub async fn seed_demo_data(storage: &dyn Storage) -> Result<()> {
    if !storage.get_all_processes().await?.is_empty() {
        return Ok(());
    }

    let planning = storage
        .create_process(NewProcess {
            name: "Strategic Planning".to_string(),
            category: ProcessCategory::Strategic,
            icon: "target".to_string(),
        })
        .await?;
    let production = storage
        .create_process(NewProcess {
            name: "Production".to_string(),
            category: ProcessCategory::Operational,
            icon: "factory".to_string(),
        })
        .await?;
    storage
        .create_process(NewProcess {
            name: "Human Resources".to_string(),
            category: ProcessCategory::Support,
            icon: "users".to_string(),
        })
        .await?;

    let review = storage
        .create_subprocess(NewSubprocess {
            name: "Annual Review".to_string(),
            process_id: planning.id,
        })
        .await?;
    let assembly = storage
        .create_subprocess(NewSubprocess {
            name: "Assembly Line".to_string(),
            process_id: production.id,
        })
        .await?;

    storage
        .create_document(NewDocument {
            name: "Planning Handbook".to_string(),
            doc_type: DocumentType::Manual,
            subprocess_id: Some(review.id),
            other_doc_type_id: None,
            version: "1.0".to_string(),
            description: Some("How the annual planning cycle runs".to_string()),
            content: "Kick off planning in Q3.".to_string(),
            approval_date: Utc::now(),
            approvers: "Head of Strategy".to_string(),
            keywords: vec!["planning".to_string(), "handbook".to_string()],
            active: true,
        })
        .await?;
    storage
        .create_document(NewDocument {
            name: "Line Startup Procedure".to_string(),
            doc_type: DocumentType::Sop,
            subprocess_id: Some(assembly.id),
            other_doc_type_id: None,
            version: "2.1".to_string(),
            description: None,
            content: "Verify guards before powering the line.".to_string(),
            approval_date: Utc::now(),
            approvers: "Plant Manager".to_string(),
            keywords: vec!["safety".to_string()],
            active: true,
        })
        .await?;

    let policies = storage
        .create_other_doc_type(NewOtherDocType {
            name: "Policies".to_string(),
            icon: "shield".to_string(),
        })
        .await?;
    storage
        .create_document(NewDocument {
            name: "Remote Work Policy".to_string(),
            doc_type: DocumentType::Other,
            subprocess_id: None,
            other_doc_type_id: Some(policies.id),
            version: "1.0".to_string(),
            description: None,
            content: "Up to three remote days per week.".to_string(),
            approval_date: Utc::now(),
            approvers: "HR Director".to_string(),
            keywords: vec![],
            active: true,
        })
        .await?;

    info!("demo dataset seeded");
    Ok(())
}
