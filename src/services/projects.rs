//! Project data source.
//!
//! `MockProjectSource` serves a fixed seed of projects and nudges active ones
//! forward on every fetch, imitating live progress.

use crate::config::SimulatorConfig;
use crate::types::{Project, ProjectStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Project source unavailable: {0}")]
    Unavailable(String),
}

/// Something that can produce the current project list.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Fetch the full project list.
    async fn fetch_projects(&self) -> Result<Vec<Project>, FetchError>;

    /// Look up a single project by id.
    async fn fetch_project(&self, id: u32) -> Result<Option<Project>, FetchError>;
}

/// In-memory source with a randomized progress simulator.
pub struct MockProjectSource {
    projects: Mutex<Vec<Project>>,
    rng: Mutex<StdRng>,
    config: SimulatorConfig,
}

impl MockProjectSource {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic source for tests.
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulatorConfig, rng: StdRng) -> Self {
        Self {
            projects: Mutex::new(seed_projects()),
            rng: Mutex::new(rng),
            config,
        }
    }

    /// Replace the seeded project list.
    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        *self.projects.lock().unwrap_or_else(|e| e.into_inner()) = projects;
        self
    }

    /// Run one simulator step and return the resulting list.
    fn simulate(&self) -> Vec<Project> {
        let mut projects = self.projects.lock().unwrap_or_else(|e| e.into_inner());
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let next = simulate_progress(
            &projects,
            &mut *rng,
            self.config.progress_chance,
            self.config.max_increment,
        );
        if next != *projects {
            debug!("Simulated progress update");
            *projects = next;
        }
        projects.clone()
    }

    fn fetch_latency(&self) -> Duration {
        let min = self.config.latency_min_ms;
        let max = self.config.latency_max_ms.max(min);
        let ms = if max == min {
            min
        } else {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(min..=max)
        };
        Duration::from_millis(ms)
    }
}

#[async_trait]
impl ProjectSource for MockProjectSource {
    async fn fetch_projects(&self) -> Result<Vec<Project>, FetchError> {
        let projects = self.simulate();
        tokio::time::sleep(self.fetch_latency()).await;
        Ok(projects)
    }

    async fn fetch_project(&self, id: u32) -> Result<Option<Project>, FetchError> {
        let found = self
            .projects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.id == id)
            .cloned();
        tokio::time::sleep(Duration::from_millis(self.config.lookup_latency_ms)).await;
        Ok(found)
    }
}

/// Apply one random step to every active, unfinished project.
///
/// Each eligible project advances with probability `chance` by a uniform
/// increment in `1..=max_increment`.
pub fn simulate_progress(
    projects: &[Project],
    rng: &mut impl Rng,
    chance: f64,
    max_increment: u8,
) -> Vec<Project> {
    let chance = chance.clamp(0.0, 1.0);
    let max_increment = max_increment.max(1);

    projects
        .iter()
        .map(|project| {
            if project.status != ProjectStatus::Active || project.progress >= 100 {
                return project.clone();
            }
            if rng.gen_bool(chance) {
                advance_project(project, rng.gen_range(1..=max_increment))
            } else {
                project.clone()
            }
        })
        .collect()
}

/// Advance a project's progress by `increment` percent, capped at 100.
///
/// Completed tasks are recomputed proportionally and the project becomes
/// `Completed` once it reaches 100.
pub fn advance_project(project: &Project, increment: u8) -> Project {
    let progress = project.progress.saturating_add(increment).min(100);
    let tasks_completed = (u64::from(progress) * u64::from(project.tasks_total) / 100) as u32;
    let status = if progress >= 100 {
        ProjectStatus::Completed
    } else {
        project.status
    };

    Project {
        progress,
        tasks_completed,
        status,
        ..project.clone()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// The fixed starting data set.
pub fn seed_projects() -> Vec<Project> {
    vec![
        Project {
            id: 1,
            name: "Project A".to_string(),
            tasks_completed: 25,
            tasks_total: 50,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
            status: ProjectStatus::Active,
            progress: 50,
        },
        Project {
            id: 2,
            name: "Project B".to_string(),
            tasks_completed: 75,
            tasks_total: 140,
            start_date: date(2023, 6, 1),
            end_date: date(2024, 3, 31),
            status: ProjectStatus::Active,
            progress: 54,
        },
        Project {
            id: 3,
            name: "Project C".to_string(),
            tasks_completed: 80,
            tasks_total: 85,
            start_date: date(2024, 6, 1),
            end_date: date(2024, 9, 30),
            status: ProjectStatus::Completed,
            progress: 94,
        },
        Project {
            id: 4,
            name: "Project D".to_string(),
            tasks_completed: 10,
            tasks_total: 100,
            start_date: date(2024, 3, 1),
            end_date: date(2024, 12, 31),
            status: ProjectStatus::OnHold,
            progress: 10,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_config() -> SimulatorConfig {
        SimulatorConfig {
            latency_min_ms: 0,
            latency_max_ms: 0,
            lookup_latency_ms: 0,
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn test_advance_caps_at_100_and_completes() {
        let mut project = seed_projects().remove(0);
        project.progress = 97;

        let advanced = advance_project(&project, 5);
        assert_eq!(advanced.progress, 100);
        assert_eq!(advanced.status, ProjectStatus::Completed);
        assert_eq!(advanced.tasks_completed, advanced.tasks_total);
    }

    #[test]
    fn test_advance_recomputes_tasks_proportionally() {
        let project = seed_projects().remove(1); // 54% of 140
        let advanced = advance_project(&project, 3);
        assert_eq!(advanced.progress, 57);
        assert_eq!(advanced.tasks_completed, 79); // floor(0.57 * 140)
        assert_eq!(advanced.status, ProjectStatus::Active);
    }

    #[test]
    fn test_simulation_only_touches_active_projects() {
        let projects = seed_projects();
        let mut rng = StdRng::seed_from_u64(7);

        let next = simulate_progress(&projects, &mut rng, 1.0, 5);
        // Completed and on-hold projects are left alone
        assert_eq!(next[2], projects[2]);
        assert_eq!(next[3], projects[3]);
        // Active ones always move with chance = 1.0
        for i in 0..2 {
            let delta = next[i].progress - projects[i].progress;
            assert!((1..=5).contains(&delta));
        }
    }

    #[test]
    fn test_simulation_with_zero_chance_is_identity() {
        let projects = seed_projects();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(simulate_progress(&projects, &mut rng, 0.0, 5), projects);
    }

    #[tokio::test]
    async fn test_progress_accumulates_across_fetches() {
        let config = SimulatorConfig {
            progress_chance: 1.0,
            ..instant_config()
        };
        let source = MockProjectSource::with_seed(config, 42);

        let first = source.fetch_projects().await.unwrap();
        let second = source.fetch_projects().await.unwrap();
        assert!(second[0].progress > first[0].progress || second[0].progress == 100);
        assert_eq!(second.len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_project_by_id() {
        let source = MockProjectSource::with_seed(instant_config(), 1);
        let project = source.fetch_project(3).await.unwrap().unwrap();
        assert_eq!(project.name, "Project C");
        assert!(source.fetch_project(99).await.unwrap().is_none());
    }
}
