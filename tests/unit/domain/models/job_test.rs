// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use socialrs::domain::models::job::{Job, JobState, JobStatus};
use socialrs::domain::models::platform::Platform;

fn status_with(states: &[JobState]) -> JobStatus {
    let targets = (0..states.len()).map(|i| format!("user{}", i)).collect();
    let mut status = JobStatus::new(Job::new(Platform::Instagram, "general", targets));
    for (target, state) in status.targets.iter_mut().zip(states) {
        target.state = *state;
    }
    status
}

#[test]
fn test_valid_transitions() {
    use JobState::*;

    assert!(Pending.can_transition_to(Running));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Running.can_transition_to(Succeeded));
    assert!(Running.can_transition_to(Failed));
    assert!(Failed.can_transition_to(Retrying));
    assert!(Retrying.can_transition_to(Running));
    assert!(Retrying.can_transition_to(Cancelled));
}

#[test]
fn test_invalid_transitions() {
    use JobState::*;

    // 终态不能再改变（Failed → Retrying 除外）
    assert!(!Succeeded.can_transition_to(Running));
    assert!(!Succeeded.can_transition_to(Failed));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(!Failed.can_transition_to(Running));
    // 执行中的目标不能被取消
    assert!(!Running.can_transition_to(Cancelled));
    assert!(!Pending.can_transition_to(Succeeded));
}

#[test]
fn test_terminal_states() {
    assert!(JobState::Succeeded.is_terminal());
    assert!(JobState::Failed.is_terminal());
    assert!(JobState::Cancelled.is_terminal());
    assert!(!JobState::Pending.is_terminal());
    assert!(!JobState::Running.is_terminal());
    assert!(!JobState::Retrying.is_terminal());
}

#[test]
fn test_state_string_roundtrip() {
    for state in [
        JobState::Pending,
        JobState::Running,
        JobState::Retrying,
        JobState::Succeeded,
        JobState::Failed,
        JobState::Cancelled,
    ] {
        assert_eq!(state.to_string().parse::<JobState>(), Ok(state));
    }
    assert!("done".parse::<JobState>().is_err());
}

#[test]
fn test_job_splits_into_ordered_tasks() {
    // Given: 三个目标的作业
    let job = Job::new(
        Platform::TikTok,
        "busqueda",
        vec!["a".to_string(), "b".to_string(), "c".to_string()],
    );

    // When: 拆分任务
    let tasks = job.tasks();

    // Then: 保持提交顺序，初始未尝试
    assert_eq!(tasks.len(), 3);
    for (index, task) in tasks.iter().enumerate() {
        assert_eq!(task.index, index);
        assert_eq!(task.job_id, job.id);
        assert_eq!(task.purpose, "busqueda");
        assert_eq!(task.attempt, 0);
        assert_eq!(task.waiting_state(), JobState::Pending);
    }
    assert_eq!(tasks[1].target, "b");
}

#[test]
fn test_retried_task_waits_in_retrying() {
    let job = Job::new(Platform::X, "general", vec!["a".to_string()]);
    let mut task = job.tasks().remove(0);
    task.attempt = 1;

    assert_eq!(task.waiting_state(), JobState::Retrying);
}

#[test]
fn test_derive_state_from_targets() {
    use JobState::*;

    assert_eq!(status_with(&[Pending, Pending]).derive_state(), Pending);
    assert_eq!(status_with(&[Running, Pending]).derive_state(), Running);
    assert_eq!(status_with(&[Succeeded, Pending]).derive_state(), Running);
    assert_eq!(status_with(&[Retrying, Succeeded]).derive_state(), Retrying);
    assert_eq!(status_with(&[Succeeded, Failed]).derive_state(), Succeeded);
    assert_eq!(status_with(&[Failed, Failed]).derive_state(), Failed);
    assert_eq!(status_with(&[Cancelled, Cancelled]).derive_state(), Cancelled);
    assert_eq!(status_with(&[Cancelled, Failed]).derive_state(), Cancelled);
    assert_eq!(status_with(&[Cancelled, Succeeded]).derive_state(), Succeeded);
}

#[test]
fn test_new_status_counts() {
    let status = status_with(&[JobState::Pending, JobState::Pending, JobState::Pending]);

    assert_eq!(status.count(JobState::Pending), 3);
    assert_eq!(status.count(JobState::Running), 0);
    assert!(!status.cancel_requested);
    assert!(status.finished_at.is_none());
}
