//! Song façade behaviour against the in-memory repository.
//!
//! Runs without a database and covers the same observable contract as the
//! Diesel suite.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use songbook::domain::{NewSong, Song, SongChanges, SongQuery, SongService};
use songbook::test_support::{InMemorySongRepository, MutableClock};

mod support;

use support::{fixed_clock, fixed_instant};

struct World {
    clock: Arc<MutableClock>,
    repo: Arc<InMemorySongRepository>,
    songs: SongService<InMemorySongRepository>,
}

#[fixture]
fn world() -> World {
    let clock = fixed_clock();
    let repo = Arc::new(InMemorySongRepository::default());
    let songs = SongService::new(Arc::clone(&repo), clock.clone());
    World { clock, repo, songs }
}

fn yesterday() -> NewSong {
    NewSong::new("Yesterday")
        .and_then(|song| song.with_artist("The Beatles"))
        .and_then(|song| song.with_album("Help!"))
        .expect("valid song")
}

async fn insert(world: &World, song: NewSong) -> Song {
    world
        .songs
        .insert_and_fetch(&song)
        .await
        .expect("insert song")
}

#[rstest]
#[tokio::test]
async fn ids_are_sequential_and_stamps_come_from_the_clock(world: World) {
    let first = world.songs.insert(&yesterday()).await.expect("insert");
    world.clock.advance(Duration::from_secs(1));
    let second = insert(&world, yesterday()).await;

    assert_eq!(first.get() + 1, second.id().get());
    assert_eq!(
        second.created_at(),
        fixed_instant() + chrono::TimeDelta::seconds(1)
    );
    assert_eq!(world.repo.len(), 2);
}

#[rstest]
#[tokio::test]
async fn repeated_updates_keep_increasing_updated_at(world: World) {
    let song = insert(&world, yesterday()).await;
    let changes = SongChanges::new();

    let once = world
        .songs
        .update_and_fetch_by_id(song.id(), &changes)
        .await
        .expect("update")
        .expect("exists");
    let twice = world
        .songs
        .update_and_fetch_by_id(song.id(), &changes)
        .await
        .expect("update")
        .expect("exists");

    assert!(once.updated_at() > song.updated_at());
    assert!(twice.updated_at() > once.updated_at());
    assert_eq!(twice.created_at(), song.created_at());
}

#[rstest]
#[tokio::test]
async fn update_and_fetch_requires_an_instance(world: World) {
    let song = insert(&world, yesterday()).await;
    let changes = SongChanges::new()
        .with_artist("The Beatlemen")
        .expect("valid artist");

    let misuse = world
        .songs
        .update_and_fetch(&SongQuery::table(), &changes)
        .await
        .expect_err("table-level query");
    let updated = world
        .songs
        .update_and_fetch(&SongQuery::instance(&song), &changes)
        .await
        .expect("instance update")
        .expect("exists");

    assert!(misuse.is_misuse());
    assert_eq!(updated.artist(), Some("The Beatlemen"));
}

#[rstest]
#[tokio::test]
async fn delete_by_query_reports_removed_rows(world: World) {
    insert(&world, yesterday()).await;
    insert(&world, yesterday()).await;
    insert(&world, NewSong::new("Blackbird").expect("valid song")).await;

    let removed = world
        .songs
        .delete(&SongQuery::table().name("Yesterday"))
        .await
        .expect("delete");
    let remaining = world
        .songs
        .select(&SongQuery::table())
        .await
        .expect("select");

    assert_eq!(removed, 2);
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining.first().map(Song::name),
        Some("Blackbird")
    );
}

#[rstest]
#[tokio::test]
async fn save_of_stale_copy_still_advances_updated_at(world: World) {
    let mut stale = insert(&world, yesterday()).await;
    for _ in 0..2 {
        world
            .songs
            .update(&SongQuery::table(), &SongChanges::new())
            .await
            .expect("update");
    }
    let before_save = world
        .songs
        .find_by_id(stale.id())
        .await
        .expect("find")
        .expect("exists");

    let saved = world.songs.save(&mut stale).await.expect("save");

    assert!(saved);
    assert!(stale.updated_at() > before_save.updated_at());
    assert_eq!(
        world.songs.find_by_id(stale.id()).await.expect("find"),
        Some(stale)
    );
}

#[rstest]
#[tokio::test]
async fn update_without_matches_reports_zero(world: World) {
    let song = insert(&world, yesterday()).await;

    let touched = world
        .songs
        .update(
            &SongQuery::table().name("Hey Jude"),
            &SongChanges::new().with_album("1").expect("valid album"),
        )
        .await
        .expect("update");

    assert_eq!(touched, 0);
    assert_eq!(
        world.songs.find_by_id(song.id()).await.expect("find"),
        Some(song)
    );
}

#[rstest]
#[tokio::test]
async fn save_after_delete_leaves_the_song_untouched(world: World) {
    let mut song = insert(&world, yesterday()).await;
    world
        .songs
        .delete_by_id(song.id())
        .await
        .expect("delete");
    let before = song.clone();
    world.clock.advance(Duration::from_secs(1));

    let saved = world.songs.save(&mut song).await.expect("save");

    assert!(!saved);
    assert_eq!(song, before);
    assert!(world.repo.is_empty());
}

#[rstest]
#[tokio::test]
async fn songs_serialise_with_camel_case_timestamps(world: World) {
    let song = insert(&world, yesterday()).await;

    let json = serde_json::to_value(&song).expect("serialise");

    assert_eq!(json["createdAt"], "2024-05-01T12:00:00.000000+00:00");
    assert_eq!(json["updatedAt"], json["createdAt"]);
    assert_eq!(json["album"], "Help!");
}
