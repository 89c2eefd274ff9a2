//! A container is created, filled with chunks, and challenged.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use vaultnode_chain::{LocalMicroNetworks, NodeConfig, Orchestrator};
use vaultnode_core::{
    generate_hash, Challenge, ChallengeChunkInfo, ContainerRecord, ContainerState, HashAlgorithm,
};
use vaultnode_prover::ChallengeSolver;
use vaultnode_storage::{ChunkStore, FsBackend, MetadataRepository, SledRepository};

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

const CHUNK_COUNT: usize = 40;
const RANGE_LENGTH: u64 = 48;

const EXPECTED_ROOT: &str = "8621b7794e8971268e4ec33dca672c94bd869538eb4c1ee681ad4f0381bbdd5a";
const EXPECTED_REVERSED_ROOT: &str =
    "9e9f9b13794b4599874c22a1f6cde9d3693c76c09cb0b6da599630db256f1747";

fn chunk(i: usize) -> Vec<u8> {
    format!("chunk {i:02} {LOREM}").into_bytes()
}

fn chunk_info(i: usize) -> ChallengeChunkInfo {
    ChallengeChunkInfo::new(i.to_string(), (i % 7) as u64, RANGE_LENGTH)
}

struct Node {
    dir: TempDir,
    repository: Arc<SledRepository>,
    store: ChunkStore,
    orchestrator: Orchestrator,
}

fn start_node() -> Node {
    let dir = TempDir::new().unwrap();
    let config = NodeConfig::for_data_dir(dir.path());

    let repository = Arc::new(SledRepository::open(dir.path().join("metadata")).unwrap());
    let backend = Arc::new(FsBackend::new(dir.path().join("chunks")).unwrap());
    let store = ChunkStore::new(repository.clone(), backend);
    let networks = Arc::new(LocalMicroNetworks::new(
        repository.clone(),
        config.micro_networks.clone(),
    ));
    let orchestrator = Orchestrator::start(repository.clone(), networks, config.orchestrator);

    Node {
        dir,
        repository,
        store,
        orchestrator,
    }
}

#[tokio::test]
async fn test_challenge_over_live_container() {
    let node = start_node();
    let expires = Utc::now() + Duration::days(30);
    node.repository
        .create_container(&ContainerRecord::new("c1", expires))
        .unwrap();

    let info = node.orchestrator.create_container("c1").unwrap().await.unwrap();
    assert_eq!(info.container_id, "c1");
    assert_eq!(
        node.orchestrator.get_container_state("c1").unwrap(),
        ContainerState::Running
    );

    for i in 0..CHUNK_COUNT {
        let data = chunk(i);
        let encoded = generate_hash(HashAlgorithm::Sha256, &data).to_string();
        node.store.save(&i.to_string(), "c1", &encoded, &data).unwrap();
    }
    assert_eq!(node.store.list("c1").unwrap().len(), CHUNK_COUNT);

    let forward = Challenge::new("c1", (0..CHUNK_COUNT).map(chunk_info).collect());
    node.orchestrator.save_challenge(forward.clone()).unwrap();

    let solver = ChallengeSolver::new(node.store.clone());
    let first = solver.solve(&forward).unwrap();
    let second = solver.solve(&forward).unwrap();
    assert_eq!(first.chunk_hash, EXPECTED_ROOT);
    assert_eq!(second, first);

    let reversed = Challenge::new("c1", (0..CHUNK_COUNT).rev().map(chunk_info).collect());
    let backward = solver.solve(&reversed).unwrap();
    assert_eq!(backward.chunk_hash, EXPECTED_REVERSED_ROOT);
    assert_ne!(backward.chunk_hash, first.chunk_hash);

    let record = node.orchestrator.get_container("c1").unwrap().unwrap();
    assert_eq!(record.pending_challenge, Some(forward));

    node.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_corrupted_chunk_is_purged_and_breaks_the_solve() {
    let node = start_node();
    let data = chunk(0);
    let encoded = generate_hash(HashAlgorithm::Sha256, &data).to_string();
    node.store.save("0", "c1", &encoded, &data).unwrap();

    let backend = FsBackend::new(node.dir.path().join("chunks")).unwrap();
    std::fs::write(backend.object_path("0"), b"tampered").unwrap();

    assert!(!node.store.has("0", "c1").unwrap());

    let solver = ChallengeSolver::new(node.store.clone());
    let challenge = Challenge::new("c1", vec![chunk_info(0)]);
    assert!(solver.solve(&challenge).is_err());

    node.orchestrator.shutdown().await;
}
