use tank_arena_core::{AgentId, CapturePointId};
use tank_arena_system_coordination::TargetCoordinator;

const POINT: CapturePointId = CapturePointId::new(7);

#[test]
fn claim_and_release_adjust_counts() {
    let mut coordinator = TargetCoordinator::new();

    coordinator.claim(POINT, AgentId::new(1));
    assert_eq!(coordinator.count_targeting(POINT), 1);
    coordinator.claim(POINT, AgentId::new(2));
    assert_eq!(coordinator.count_targeting(POINT), 2);

    coordinator.release(POINT, AgentId::new(1));
    assert_eq!(coordinator.count_targeting(POINT), 1);
    assert!(!coordinator.is_targeting(POINT, AgentId::new(1)));
    assert!(coordinator.is_targeting(POINT, AgentId::new(2)));
}

#[test]
fn duplicate_claims_and_absent_releases_are_no_ops() {
    let mut coordinator = TargetCoordinator::new();

    coordinator.claim(POINT, AgentId::new(4));
    coordinator.claim(POINT, AgentId::new(4));
    assert_eq!(coordinator.count_targeting(POINT), 1);

    coordinator.release(POINT, AgentId::new(5));
    coordinator.release(CapturePointId::new(99), AgentId::new(4));
    assert_eq!(coordinator.count_targeting(POINT), 1);

    coordinator.release(POINT, AgentId::new(4));
    coordinator.release(POINT, AgentId::new(4));
    assert_eq!(coordinator.count_targeting(POINT), 0);
}

#[test]
fn reset_all_is_idempotent() {
    let mut coordinator = TargetCoordinator::new();
    coordinator.claim(POINT, AgentId::new(1));
    coordinator.claim(CapturePointId::new(8), AgentId::new(2));

    coordinator.reset_all();
    assert!(coordinator.is_empty());
    assert_eq!(coordinator.count_targeting(POINT), 0);

    coordinator.reset_all();
    assert!(coordinator.is_empty());
    assert_eq!(coordinator.count_targeting(CapturePointId::new(8)), 0);
    assert_eq!(coordinator.claimed_by(AgentId::new(2)), None);
}

#[test]
fn an_agent_appears_in_at_most_one_claim_set() {
    let mut coordinator = TargetCoordinator::new();
    let points = [CapturePointId::new(0), CapturePointId::new(1), CapturePointId::new(2)];

    for round in 0..9u32 {
        for agent in 0..4u32 {
            let point = points[((round + agent) % 3) as usize];
            coordinator.claim(point, AgentId::new(agent));
        }

        let total: usize = points.iter().map(|point| coordinator.count_targeting(*point)).sum();
        assert_eq!(total, 4, "round {round}");
    }
}
