use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct MetricProgress {
    current: f64,
    target: u32,
    percentage: u8,
    daily_completions: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct WeeklyProgress {
    calories: MetricProgress,
    protein: MetricProgress,
    water: MetricProgress,
    exercise: MetricProgress,
}

#[derive(Debug, Deserialize)]
struct TodayGoals {
    calories: bool,
    water: bool,
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    today_index: usize,
    today_goals: TodayGoals,
    weekly_progress: WeeklyProgress,
}

#[derive(Debug, Deserialize)]
struct GoalsResponse {
    calories_kcal: u32,
    water_glasses: u32,
    exercise_minutes: u32,
    bmr_kcal: Option<u32>,
    tdee_kcal: Option<u32>,
    is_calculated: bool,
}

/// One `meal_goals` process per test binary, writing into its own temp dir.
/// Every test works on a fresh user id, so tests never share state. Each
/// `#[tokio::test]` has its own runtime, so clients are built per request.
struct Server {
    base_url: String,
    _child: Child,
    _data_dir: TempDir,
}

static SERVER: OnceCell<Server> = OnceCell::const_new();
static NEXT_USER: AtomicU32 = AtomicU32::new(0);

impl Server {
    async fn shared() -> &'static Server {
        SERVER.get_or_init(Server::start).await
    }

    async fn start() -> Server {
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("reserve a port")
            .port();
        let data_dir = TempDir::new().expect("create data dir");

        let child = Command::new(env!("CARGO_BIN_EXE_meal_goals"))
            .env("PORT", port.to_string())
            .env("APP_DATA_PATH", data_dir.path().join("data.json"))
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("spawn meal_goals");
        #[cfg(unix)]
        kill_on_exit::register(child.id());

        let server = Server {
            base_url: format!("http://127.0.0.1:{port}"),
            _child: child,
            _data_dir: data_dir,
        };
        tokio::time::timeout(Duration::from_secs(5), server.until_healthy())
            .await
            .expect("meal_goals never answered /health");
        server
    }

    async fn until_healthy(&self) {
        loop {
            let healthy = Client::new()
                .get(self.url("/health"))
                .send()
                .await
                .is_ok_and(|resp| resp.status().is_success());
            if healthy {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn user(&self, label: &str) -> String {
        let n = NEXT_USER.fetch_add(1, Ordering::Relaxed);
        format!("{label}-{}-{n}", std::process::id())
    }

    async fn get(&self, path: &str) -> Response {
        Client::new().get(self.url(path)).send().await.expect("GET")
    }

    async fn send_json(&self, method: reqwest::Method, path: &str, body: Value) -> Response {
        Client::new()
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request with body")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> T {
        self.get(path).await.json().await.expect("json body")
    }

    async fn complete(&self, user: &str, metric: &str, completed: bool) -> Response {
        let path = format!("/api/users/{user}/completions/{metric}");
        self.send_json(reqwest::Method::POST, &path, json!({ "completed": completed }))
            .await
    }

    async fn progress(&self, user: &str) -> ProgressResponse {
        self.get_json(&format!("/api/users/{user}/progress")).await
    }
}

/// Statics are never dropped, so the child is killed when the test binary exits.
#[cfg(unix)]
mod kill_on_exit {
    use once_cell::sync::OnceCell;

    static PID: OnceCell<libc::pid_t> = OnceCell::new();

    pub fn register(pid: u32) {
        if PID.set(pid as libc::pid_t).is_ok() {
            unsafe {
                libc::atexit(kill_child);
            }
        }
    }

    extern "C" fn kill_child() {
        if let Some(pid) = PID.get() {
            unsafe {
                libc::kill(*pid, libc::SIGTERM);
            }
        }
    }
}

#[tokio::test]
async fn http_goals_calculated_from_profile() {
    let server = Server::shared().await;
    let user = server.user("calc");

    let profile = json!({
        "age": 30,
        "height_cm": 180,
        "weight_kg": 75,
        "gender": "male",
        "activity_level": "moderate",
        "fitness_goals": ["weight_loss"]
    });
    let saved = server
        .send_json(reqwest::Method::PUT, &format!("/api/users/{user}/profile"), profile)
        .await;
    assert!(saved.status().is_success());

    let goals: GoalsResponse = server.get_json(&format!("/api/users/{user}/goals")).await;
    assert!(goals.is_calculated);
    assert_eq!(goals.bmr_kcal, Some(1787));
    assert_eq!(goals.tdee_kcal, Some(2770));
    assert_eq!(goals.calories_kcal, 2270);
    assert_eq!(goals.water_glasses, 14);
    assert_eq!(goals.exercise_minutes, 270);
}

#[tokio::test]
async fn http_unknown_user_gets_fallback_goals() {
    let server = Server::shared().await;
    let user = server.user("fallback");

    let goals: GoalsResponse = server.get_json(&format!("/api/users/{user}/goals")).await;
    assert!(!goals.is_calculated);
    assert_eq!(goals.calories_kcal, 2000);
    assert_eq!(goals.water_glasses, 8);
    assert_eq!(goals.exercise_minutes, 210);
    assert!(goals.bmr_kcal.is_none());
}

#[tokio::test]
async fn http_completing_and_uncompleting_goal() {
    let server = Server::shared().await;
    let user = server.user("track");

    let before = server.progress(&user).await;
    assert_eq!(before.weekly_progress.water.current, 0.0);
    assert_eq!(before.weekly_progress.water.target, 56);
    assert_eq!(before.weekly_progress.exercise.target, 210);
    assert_eq!(before.weekly_progress.calories.daily_completions.len(), 7);

    let completed: ProgressResponse =
        server.complete(&user, "water", true).await.json().await.unwrap();
    let water = &completed.weekly_progress.water;
    assert!(completed.today_goals.water);
    assert!(!completed.today_goals.calories);
    assert_eq!(water.current, 8.0);
    assert_eq!(water.percentage, 14);
    assert!(water.daily_completions[completed.today_index]);
    assert_eq!(completed.weekly_progress.protein.current, 0.0);

    // Completing twice must not double count.
    assert!(server.complete(&user, "water", true).await.status().is_success());
    assert_eq!(server.progress(&user).await.weekly_progress.water.current, 8.0);

    let undone: ProgressResponse =
        server.complete(&user, "water", false).await.json().await.unwrap();
    assert!(!undone.today_goals.water);
    assert_eq!(undone.weekly_progress.water.current, 0.0);
    assert!(!undone.weekly_progress.water.daily_completions[undone.today_index]);
}

#[tokio::test]
async fn http_unknown_metric_is_rejected() {
    let server = Server::shared().await;
    let user = server.user("metric");

    let response = server.complete(&user, "sleep", true).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let missing = server.get(&format!("/api/users/{}/profile", server.user("ghost"))).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
