//! Console session integration tests

use tokio::io::BufReader;

use jarvis::Session;

mod common;

use common::Doubles;

#[tokio::test]
async fn test_console_replies_until_exit() {
    let dir = tempfile::tempdir().unwrap();
    let doubles = Doubles::new();
    let session = Session::new(doubles.router(dir.path()));

    let input = tokio_test::io::Builder::new()
        .read(b"what is 2 plus 2\n")
        .read(b"\n")
        .read(b"battery\n")
        .read(b"quit\n")
        .build();
    session.run_console(BufReader::new(input)).await.unwrap();

    let mut spoken = doubles.speaker.spoken();
    spoken.sort();
    assert_eq!(
        spoken,
        vec![
            "Battery is at 80% and it is charging.".to_string(),
            "The result is 4".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_console_stops_at_exit_word() {
    let dir = tempfile::tempdir().unwrap();
    let doubles = Doubles::new();
    let session = Session::new(doubles.router(dir.path()));

    let input = tokio_test::io::Builder::new()
        .read(b"exit\nopen github\n")
        .build();
    session.run_console(BufReader::new(input)).await.unwrap();

    assert!(doubles.speaker.spoken().is_empty());
    assert!(doubles.launcher.urls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_speaks_reply() {
    let dir = tempfile::tempdir().unwrap();
    let doubles = Doubles::new();
    let session = Session::new(doubles.router(dir.path()));

    let dispatch = session.submit("who are you").await.unwrap().unwrap();
    assert_eq!(dispatch.rule, jarvis::RuleId::Identity);
    assert_eq!(doubles.speaker.spoken(), vec![dispatch.reply.text]);
}
