use glam::Vec2;
use scatter_gallery::catalog::{Catalog, ImageId, ImageRecord};
use scatter_gallery::config::Configuration;
use scatter_gallery::events::{LoadTexture, TextureOutcome, UserInput};
use scatter_gallery::gallery::{Gesture, Selection};
use scatter_gallery::scene::Frame;
use scatter_gallery::tasks::{loader, session};
use scatter_gallery::texture::Material;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn two_images(dir: &std::path::Path) -> Catalog {
    let a = dir.join("a.png");
    image::RgbaImage::new(40, 20).save(&a).unwrap();
    let b = dir.join("b.png");
    std::fs::write(&b, b"truncated").unwrap();
    Catalog::from_records(vec![
        ImageRecord::from_path(ImageId(1), a),
        ImageRecord::from_path(ImageId(2), b),
    ])
    .unwrap()
}

async fn next_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for frame")
        .expect("session closed")
}

fn cfg() -> Configuration {
    Configuration {
        placement_seed: Some(11),
        ..Configuration::default()
    }
}

#[test]
fn navigation_scenario_from_catalog() {
    let catalog = Catalog::from_records(vec![
        ImageRecord::from_path(ImageId(1), PathBuf::from("a.png")),
        ImageRecord::from_path(ImageId(2), PathBuf::from("b.png")),
    ])
    .unwrap();
    let mut s = session::Session::new(&cfg(), catalog, Vec2::new(1920.0, 1080.0));
    let step = |s: &mut session::Session, g: Gesture| {
        s.apply_input(UserInput::Gesture(g));
        s.controller().selection()
    };
    assert_eq!(step(&mut s, Gesture::ClickPlane(ImageId(1))), Selection::Viewing(0));
    assert_eq!(step(&mut s, Gesture::Next), Selection::Viewing(1));
    assert_eq!(step(&mut s, Gesture::Next), Selection::Viewing(0));
    assert_eq!(step(&mut s, Gesture::Close), Selection::Browsing);
}

#[test]
fn popup_click_on_close_and_background() {
    let catalog = Catalog::from_records(vec![
        ImageRecord::from_path(ImageId(5), PathBuf::from("a.png")),
    ])
    .unwrap();
    let mut s = session::Session::new(&cfg(), catalog, Vec2::new(1600.0, 900.0));
    assert!(s.popup_layout().is_none());

    s.apply_input(UserInput::Gesture(Gesture::ClickPlane(ImageId(5))));
    let layout = s.popup_layout().unwrap();
    let close = Vec2::new(layout.close.x + 1.0, layout.close.y + 1.0);
    s.apply_input(UserInput::PopupClick(close));
    assert_eq!(s.controller().selection(), Selection::Browsing);

    s.apply_input(UserInput::Gesture(Gesture::ClickPlane(ImageId(5))));
    s.apply_input(UserInput::PopupClick(Vec2::new(2.0, 2.0)));
    assert_eq!(s.controller().selection(), Selection::Browsing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn textures_resolve_and_gestures_apply_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = two_images(tmp.path());

    let (input_tx, input_rx) = mpsc::channel::<UserInput>(8);
    let (load_tx, load_rx) = mpsc::channel::<LoadTexture>(8);
    let (outcome_tx, outcome_rx) = mpsc::channel::<TextureOutcome>(8);
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(32);
    let cancel = CancellationToken::new();

    let loader = tokio::spawn(loader::run(
        load_rx,
        outcome_tx,
        cancel.clone(),
        2,
        Duration::from_secs(5),
    ));
    let session = tokio::spawn(session::run(
        session::Session::new(&cfg(), catalog, Vec2::new(1920.0, 1080.0)),
        input_rx,
        outcome_rx,
        load_tx,
        frame_tx,
        cancel.clone(),
    ));

    let first = next_frame(&mut frame_rx).await;
    assert_eq!(first.planes.len(), 2);
    assert!(first.planes.iter().all(|p| p.material == Material::Placeholder));
    let anchors: Vec<_> = first.planes.iter().map(|p| p.placed.position).collect();

    // Wait until both textures have resolved one way or the other.
    let settled = loop {
        let frame = next_frame(&mut frame_rx).await;
        if frame.planes.iter().all(|p| p.material != Material::Placeholder) {
            break frame;
        }
    };
    let good = settled.plane(ImageId(1)).unwrap();
    assert_eq!(good.material, Material::Texture(tmp.path().join("a.png")));
    assert!((good.placed.size.aspect() - 2.0).abs() < 1e-4);
    let bad = settled.plane(ImageId(2)).unwrap();
    assert_eq!(bad.material, Material::FallbackTint([255, 0, 255]));
    assert_eq!(bad.placed.size.width, 1.0);
    assert_eq!(bad.placed.size.height, 1.0);
    let settled_anchors: Vec<_> = settled.planes.iter().map(|p| p.placed.position).collect();
    assert_eq!(anchors, settled_anchors);

    for g in [Gesture::ClickPlane(ImageId(2)), Gesture::Next, Gesture::Next] {
        input_tx.send(UserInput::Gesture(g)).await.unwrap();
    }
    let mut last = None;
    for _ in 0..3 {
        last = Some(next_frame(&mut frame_rx).await);
    }
    let popup = last.unwrap().popup.expect("popup open");
    assert_eq!(popup.index, 1);
    assert_eq!(popup.material, Material::FallbackTint([255, 0, 255]));

    drop(input_tx);
    session.await.unwrap().unwrap();
    loader.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retry_remounts_a_failed_plane() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = two_images(tmp.path());

    let (input_tx, input_rx) = mpsc::channel::<UserInput>(8);
    let (load_tx, mut load_rx) = mpsc::channel::<LoadTexture>(8);
    let (outcome_tx, outcome_rx) = mpsc::channel::<TextureOutcome>(8);
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(32);
    let cancel = CancellationToken::new();

    let session = tokio::spawn(session::run(
        session::Session::new(&cfg(), catalog, Vec2::new(1920.0, 1080.0)),
        input_rx,
        outcome_rx,
        load_tx,
        frame_tx,
        cancel.clone(),
    ));
    next_frame(&mut frame_rx).await;

    let mut requests = Vec::new();
    while requests.len() < 2 {
        let req = tokio::time::timeout(Duration::from_secs(5), load_rx.recv())
            .await
            .expect("timeout waiting for load request")
            .expect("session closed");
        requests.push(req);
    }
    let stale = requests.iter().find(|r| r.id == ImageId(2)).unwrap().clone();

    input_tx.send(UserInput::Retry(ImageId(2))).await.unwrap();
    next_frame(&mut frame_rx).await;
    let fresh = tokio::time::timeout(Duration::from_secs(5), load_rx.recv())
        .await
        .expect("timeout waiting for retry request")
        .expect("session closed");
    assert_eq!(fresh.id, ImageId(2));
    assert_ne!(fresh.request, stale.request);

    // The superseded request resolves late and must not touch the plane.
    outcome_tx
        .send(TextureOutcome {
            request: stale.request,
            id: stale.id,
            result: Err(scatter_gallery::events::TextureFailure::TimedOut),
        })
        .await
        .unwrap();
    outcome_tx
        .send(TextureOutcome {
            request: fresh.request,
            id: fresh.id,
            result: Ok(scatter_gallery::events::NativeImage {
                width: 10,
                height: 30,
                pixels: Vec::new(),
            }),
        })
        .await
        .unwrap();

    let frame = next_frame(&mut frame_rx).await;
    let plane = frame.plane(ImageId(2)).unwrap();
    assert!(matches!(plane.material, Material::Texture(_)));
    assert!((plane.placed.size.aspect() - 1.0 / 3.0).abs() < 1e-4);

    cancel.cancel();
    session.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn outcome_after_unmount_never_reaches_the_plane() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = two_images(tmp.path());

    let (input_tx, input_rx) = mpsc::channel::<UserInput>(8);
    let (load_tx, mut load_rx) = mpsc::channel::<LoadTexture>(8);
    let (outcome_tx, outcome_rx) = mpsc::channel::<TextureOutcome>(8);
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(32);
    let cancel = CancellationToken::new();

    let session = tokio::spawn(session::run(
        session::Session::new(&cfg(), catalog, Vec2::new(1920.0, 1080.0)),
        input_rx,
        outcome_rx,
        load_tx,
        frame_tx,
        cancel.clone(),
    ));
    next_frame(&mut frame_rx).await;

    let mut requests = Vec::new();
    while requests.len() < 2 {
        let req = tokio::time::timeout(Duration::from_secs(5), load_rx.recv())
            .await
            .expect("timeout waiting for load request")
            .expect("session closed");
        requests.push(req);
    }
    let dropped = requests.iter().find(|r| r.id == ImageId(2)).unwrap().clone();
    let kept = requests.iter().find(|r| r.id == ImageId(1)).unwrap().clone();

    input_tx.send(UserInput::Unmount(ImageId(2))).await.unwrap();
    let frame = next_frame(&mut frame_rx).await;
    assert_eq!(frame.plane(ImageId(2)).unwrap().material, Material::Placeholder);

    // Both outcomes race in; only the mounted plane may change.
    let image = || {
        Ok(scatter_gallery::events::NativeImage {
            width: 40,
            height: 20,
            pixels: Vec::new(),
        })
    };
    for req in [&dropped, &kept] {
        outcome_tx
            .send(TextureOutcome {
                request: req.request,
                id: req.id,
                result: image(),
            })
            .await
            .unwrap();
    }

    let frame = next_frame(&mut frame_rx).await;
    assert!(matches!(
        frame.plane(ImageId(1)).unwrap().material,
        Material::Texture(_)
    ));
    let gone = frame.plane(ImageId(2)).unwrap();
    assert_eq!(gone.material, Material::Placeholder);
    assert_eq!(gone.placed.size.width, 1.0);
    assert_eq!(gone.placed.size.height, 1.0);

    cancel.cancel();
    session.await.unwrap().unwrap();
}

#[tokio::test]
async fn queued_loads_go_out_before_buffered_gestures() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = two_images(tmp.path());

    let (input_tx, input_rx) = mpsc::channel::<UserInput>(16);
    let (load_tx, mut load_rx) = mpsc::channel::<LoadTexture>(8);
    let (_outcome_tx, outcome_rx) = mpsc::channel::<TextureOutcome>(8);
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(32);
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        input_tx.send(UserInput::Gesture(Gesture::ClickPlane(ImageId(1)))).await.unwrap();
        input_tx.send(UserInput::Gesture(Gesture::Close)).await.unwrap();
    }

    let session = tokio::spawn(session::run(
        session::Session::new(&cfg(), catalog, Vec2::new(1920.0, 1080.0)),
        input_rx,
        outcome_rx,
        load_tx,
        frame_tx,
        cancel.clone(),
    ));
    next_frame(&mut frame_rx).await;
    // The first gesture frame is only emitted after both mount requests were handed off.
    next_frame(&mut frame_rx).await;
    assert!(load_rx.try_recv().is_ok());
    assert!(load_rx.try_recv().is_ok());

    cancel.cancel();
    session.await.unwrap().unwrap();
}
