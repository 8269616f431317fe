//! Leader/follower convergence: a follower that installs a snapshot and
//! then replays the rest of the log ends up with the leader's rows.

use std::time::Duration;

use catalog_fsm::{LogEntry, Request, SnapshotData, StateMachine};
use catalog_state::{Coordinate, CoordinateEntry, Node, StateStore, WatchSet};

fn state_machine() -> StateMachine {
    StateMachine::new(StateStore::open_in_memory().unwrap()).unwrap()
}

fn coord(seed: f64) -> Coordinate {
    Coordinate {
        vec: vec![seed, seed * 2.0],
        error: 0.4,
        adjustment: 0.0,
        height: 0.0001,
    }
}

fn log() -> Vec<LogEntry> {
    vec![
        LogEntry::new(
            1,
            Request::RegisterNode {
                node: Node::new("node1", "10.0.0.1"),
            },
        ),
        LogEntry::new(
            2,
            Request::RegisterNode {
                node: Node::new("node2", "10.0.0.2"),
            },
        ),
        LogEntry::new(
            3,
            Request::CoordinateBatchUpdate {
                updates: vec![
                    CoordinateEntry::new("node1", "", coord(1.0)),
                    CoordinateEntry::new("node2", "", coord(2.0)),
                    CoordinateEntry::new("node3", "", coord(3.0)),
                ],
            },
        ),
        LogEntry::new(
            4,
            Request::CoordinateBatchUpdate {
                updates: vec![CoordinateEntry::new(
                    "node2",
                    "",
                    Coordinate {
                        height: f64::INFINITY,
                        ..coord(9.0)
                    },
                )],
            },
        ),
        LogEntry::new(
            5,
            Request::DeregisterNode {
                node: "node1".to_string(),
            },
        ),
        LogEntry::new(
            6,
            Request::CoordinateBatchUpdate {
                updates: vec![CoordinateEntry::new("node2", "wan", coord(4.0))],
            },
        ),
    ]
}

#[test]
fn replay_and_snapshot_converge() {
    let entries = log();

    let mut leader = state_machine();
    leader.apply_all(&entries).unwrap();

    // Follower A replays the full log.
    let mut replayed = state_machine();
    replayed.apply_all(&entries).unwrap();

    // Follower B installs a snapshot taken after entry 3, then catches up.
    let mut partial = state_machine();
    partial.apply_all(&entries[..3]).unwrap();
    let bytes = partial.build_snapshot().unwrap().to_bytes().unwrap();

    let mut caught_up = state_machine();
    caught_up
        .install_snapshot(&SnapshotData::from_bytes(&bytes).unwrap())
        .unwrap();
    assert_eq!(caught_up.last_applied(), 3);
    caught_up.apply_all(&entries[3..]).unwrap();

    let expected = leader.store().coordinates(None, None).unwrap();
    assert_eq!(expected.0, 6);
    assert_eq!(
        expected.1,
        vec![
            CoordinateEntry::new("node2", "", coord(2.0)),
            CoordinateEntry::new("node2", "wan", coord(4.0)),
        ]
    );
    assert_eq!(replayed.store().coordinates(None, None).unwrap(), expected);
    assert_eq!(caught_up.store().coordinates(None, None).unwrap(), expected);
}

#[tokio::test]
async fn snapshot_install_wakes_blocked_readers() {
    let mut leader = state_machine();
    leader.apply_all(&log()[..3]).unwrap();
    let snapshot = leader.build_snapshot().unwrap();

    let mut follower = state_machine();
    let mut ws = WatchSet::new();
    let (idx, set) = follower
        .store()
        .coordinate(Some(&mut ws), "node1", None)
        .unwrap();
    assert_eq!(idx, 0);
    assert!(set.is_empty());

    follower.install_snapshot(&snapshot).unwrap();

    assert!(ws.wait_timeout(Duration::from_secs(1)).await);
    let (idx, set) = follower.store().coordinate(None, "node1", None).unwrap();
    assert_eq!(idx, 3);
    assert_eq!(set[""], coord(1.0));
}
