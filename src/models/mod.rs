mod cron_schedule;
mod ipo;
mod mutual_fund_nav;
mod scheduled_task;

pub use cron_schedule::CompiledSchedule;
pub use ipo::{IpoData, IpoList};
pub use mutual_fund_nav::{MutualFundNav, Nav};
pub use scheduled_task::{
    ExecutionUpdate, JobName, JobSchedule, ScheduledTask, StatusChange, TaskStatus,
};

#[cfg(test)]
pub(crate) use mutual_fund_nav::sample_nav;
