//! HTTP API handlers for centers-web

pub mod audit;
pub mod centers;
pub mod dashboard;
pub mod health;
pub mod import;
pub mod participants;

pub use audit::{export_audit_log, list_audit_log};
pub use centers::{map_view, national_center_add, national_centers_list};
pub use dashboard::national_dashboard;
pub use health::health_routes;
pub use import::{import_confirm, import_preview, import_template};
pub use participants::{
    create_participant, delete_participant, get_participant, list_participants, participant_map,
    update_participant,
};
