use jigsaw_core::{
    decode_record, encode_record, GroupError, GroupId, GroupRecord, Puzzle, PuzzleRecord, ReconstructError,
    SetupError, Side, SNAPSHOT_VERSION,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn played() -> Puzzle {
    let mut puzzle = Puzzle::with_rng(100, 100, 100, StdRng::seed_from_u64(17)).expect("puzzle");
    puzzle.setup(9, 4, 2).expect("setup");
    let first = puzzle.create_group(0, 1).expect("group");
    let second = puzzle.create_group(3, 4).expect("group");
    puzzle.merge_groups(first, second).expect("merge");
    puzzle.create_group(7, 8).expect("group");
    puzzle.set_piece_visible(5, false);
    puzzle
}

fn restore(record: &PuzzleRecord) -> Result<Puzzle, ReconstructError> {
    Puzzle::from_record(record, StdRng::seed_from_u64(0))
}

#[test]
fn record_round_trips_through_reconstruction() {
    let puzzle = played();
    let record = puzzle.to_record();
    assert_eq!(record.version, SNAPSHOT_VERSION);
    assert_eq!(record.groups.len(), 2);

    let restored = restore(&record).expect("restore");
    assert_eq!(restored.to_record(), record);
    assert_eq!(restored.progress(), puzzle.progress());
    assert!(!restored.piece(5).expect("piece").is_visible());
    assert_eq!(
        restored.group_of(4).map(|group| group.members().collect::<Vec<_>>()),
        Some(vec![0, 1, 3, 4])
    );
}

#[test]
fn binary_round_trip() {
    let record = played().to_record();
    let bytes = encode_record(&record).expect("encode");
    let decoded = decode_record(&bytes).expect("decode");
    assert_eq!(decoded, record);
    assert!(restore(&decoded).is_ok());
}

#[test]
fn json_round_trip() {
    let record = played().to_record();
    let json = serde_json::to_string(&record).expect("json");
    let decoded: PuzzleRecord = serde_json::from_str(&json).expect("json");
    assert_eq!(decoded, record);
}

#[test]
fn restored_groups_get_fresh_generations() {
    let puzzle = played();
    let stale: Vec<GroupId> = puzzle.groups().map(|group| group.id()).collect();
    let mut restored = restore(&puzzle.to_record()).expect("restore");
    let merged = restored
        .merge_groups(stale[0], stale[1])
        .expect("merge");
    assert!(stale.iter().all(|id| id.generation < merged.generation));
}

#[test]
fn next_generation_is_raised_past_stored_groups() {
    let mut record = played().to_record();
    record.next_generation = 0;
    let mut restored = restore(&record).expect("restore");
    let max = record
        .groups
        .iter()
        .map(|group| group.id.generation)
        .max()
        .expect("groups");
    let id = restored.create_group(2, 6).expect("group");
    assert!(id.generation > max);
}

#[test]
fn exhausted_generations_refuse_new_groups() {
    let mut record = played().to_record();
    record.next_generation = u32::MAX;
    let mut restored = restore(&record).expect("restore");
    assert_eq!(restored.join(2, 6), Err(GroupError::GenerationsExhausted));
    assert_eq!(restored.group_of(2), None);
    assert_eq!(restored.group_of(6), None);

    let ids: Vec<GroupId> = restored.groups().map(|group| group.id()).collect();
    assert_eq!(
        restored.merge_groups(ids[0], ids[1]),
        Err(GroupError::GenerationsExhausted)
    );
    assert_eq!(restored.to_record(), record);
}

#[test]
fn rejects_generations_without_successor() {
    let mut record = played().to_record();
    let pair = record
        .groups
        .iter()
        .position(|group| group.pieces.len() == 2)
        .expect("pair");
    let last = GroupId {
        anchor: record.groups[pair].id.anchor,
        generation: u32::MAX,
    };
    record.groups[pair].id = last;
    for &member in &record.groups[pair].pieces {
        record.pieces[member as usize].group = Some(last);
    }
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::Generation(last))
    );
}

#[test]
fn rejects_other_versions() {
    let mut record = played().to_record();
    record.version += 1;
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::Version {
            expected: SNAPSHOT_VERSION,
            found: SNAPSHOT_VERSION + 1,
        })
    );
}

#[test]
fn rejects_invalid_settings() {
    let mut record = played().to_record();
    record.snap_strength = 0;
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::Config(SetupError::SnapStrength(0)))
    );
}

#[test]
fn rejects_missing_pieces() {
    let mut record = played().to_record();
    record.pieces.remove(3);
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::PieceCount {
            expected: 9,
            found: 8,
        })
    );

    let mut record = played().to_record();
    record.pieces[3] = record.pieces[2].clone();
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::DuplicatePiece { id: 2 })
    );
}

#[test]
fn rejects_broken_neighbors() {
    let mut record = played().to_record();
    record.pieces[4].right = Some(8);
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::Neighbor {
            id: 4,
            side: Side::Right.name(),
            neighbor: 8,
            expected: Some(5),
        })
    );

    let mut record = played().to_record();
    record.pieces[4].top = None;
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::MissingNeighbor {
            id: 4,
            side: "top",
        })
    );
}

#[test]
fn rejects_empty_curves_and_bad_steps() {
    let mut record = played().to_record();
    record.pieces[6].left_curve.clear();
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::EmptyCurve { id: 6, side: "left" })
    );

    let mut record = played().to_record();
    record.pieces[6].rotation_step = 4;
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::RotationStep { id: 6, step: 4 })
    );
}

#[test]
fn rejects_dangling_group_references() {
    let mut record = played().to_record();
    let ghost = GroupId {
        anchor: 2,
        generation: 99,
    };
    record.pieces[2].group = Some(ghost);
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::UnknownGroup {
            piece: 2,
            group: ghost,
        })
    );

    let mut record = played().to_record();
    let group = record.groups[0].id;
    record.groups[0].pieces.push(40);
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::UnknownMember { group, piece: 40 })
    );
}

#[test]
fn rejects_inconsistent_membership() {
    let mut record = played().to_record();
    let group = record.groups[0].id;
    record.groups[0].pieces.push(2);
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::Membership {
            piece: 2,
            listed: group,
            stored: None,
        })
    );

    let mut record = played().to_record();
    let group = record.groups[0].id;
    let dropped = record.groups[0].pieces.pop().expect("member");
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::Unlisted {
            piece: dropped,
            group,
        })
    );

    let mut record = played().to_record();
    let duplicate = record.groups[1].clone();
    record.groups.push(duplicate.clone());
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::DuplicateGroup(duplicate.id))
    );
}

#[test]
fn rejects_single_member_groups() {
    let mut record = played().to_record();
    let pair = record
        .groups
        .iter()
        .position(|group| group.pieces.len() == 2)
        .expect("pair");
    let GroupRecord { id, pieces } = record.groups[pair].clone();
    record.groups[pair].pieces.truncate(1);
    record.pieces[pieces[1] as usize].group = None;
    assert_eq!(
        restore(&record).err(),
        Some(ReconstructError::GroupTooSmall { group: id, count: 1 })
    );
}
