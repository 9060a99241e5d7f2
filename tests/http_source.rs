use pypi_charts::loader::{self, HttpSource, Source};
use pypi_charts::models::FeedKind;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

/// Serve `files` over plain HTTP on a random local port; anything else is 404.
fn serve(files: Vec<(&'static str, &'static str)>, requests: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            // Drain headers.
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let body = files
                .iter()
                .find(|(name, _)| path == format!("/data/{}", name))
                .map(|(_, body)| *body);
            let response = match body {
                Some(b) => format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    b.len(),
                    b
                ),
                None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string(),
            };
            stream.write_all(response.as_bytes()).unwrap();
        }
    });
    format!("http://{}/data/", addr)
}

#[test]
fn url_for_encodes_file_names() {
    let src = HttpSource::new("https://example.org/output/requests/").unwrap();
    assert_eq!(
        src.url_for("download_by_date_latest.csv"),
        "https://example.org/output/requests/download_by_date_latest.csv"
    );
    assert_eq!(
        src.url_for("a b.csv"),
        "https://example.org/output/requests/a%20b.csv"
    );
}

#[test]
fn fetches_latest_over_http() {
    let base = serve(
        vec![(
            "download_by_date_latest.csv",
            "download_date,daily_downloads\n2024-01-01,5\n2024-01-02,8\n",
        )],
        1,
    );
    let src = HttpSource::new(&base).unwrap();
    let feed = loader::load_feed(&src, FeedKind::Trends).unwrap();
    assert_eq!(feed.rows.len(), 2);
    assert_eq!(feed.source_name, "download_by_date_latest.csv");
}

#[test]
fn http_404_falls_back_to_manifest_snapshot() {
    let base = serve(
        vec![(
            "installer_stats_30d_20240501_000000.csv",
            "installer_name,download_count\npip,10\n",
        )],
        2,
    );
    let src = HttpSource::new(&base)
        .unwrap()
        .with_manifest(vec!["installer_stats_30d_20240501_000000.csv".into()]);
    assert_eq!(src.list().unwrap().len(), 1);
    let feed = loader::load_feed(&src, FeedKind::Installer).unwrap();
    assert_eq!(feed.source_name, "installer_stats_30d_20240501_000000.csv");
}

#[test]
fn non_success_status_is_an_error() {
    let base = serve(vec![], 1);
    let src = HttpSource::new(&base).unwrap();
    let err = src.fetch("download_by_date_latest.csv").unwrap_err();
    assert!(format!("{:#}", err).contains("404"));
}
