// tests/api_tests.rs

mod common;

use common::{error_code, math_quiz, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_and_login_work() {
    // Arrange
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;

    // Act: emails are matched case-insensitively
    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": teacher.email.to_uppercase(), "password": "password123"}))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["role"], "teacher");
    assert_eq!(body["displayName"], "Ada");
    assert_eq!(body["userId"], teacher.user_id.as_str());
}

#[tokio::test]
async fn login_failures_use_identity_codes() {
    let app = spawn_app().await;
    let student = app.register("student", "Sam").await;

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": student.email, "password": "not-the-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "auth/wrong-password");
    assert_eq!(body["error"]["message"], "Incorrect password. Please try again.");

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": "nobody@example.com", "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "auth/user-not-found");
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let app = spawn_app().await;
    let existing = app.register("student", "Sam").await;

    let cases = [
        (json!({"email": existing.email, "password": "password123", "displayName": "X", "role": "student"}), 409, "auth/email-already-in-use"),
        (json!({"email": "not-an-email", "password": "password123", "displayName": "X", "role": "student"}), 400, "auth/invalid-email"),
        (json!({"email": "new@example.com", "password": "123", "displayName": "X", "role": "student"}), 400, "auth/weak-password"),
        (json!({"email": "new@example.com", "password": "password123", "displayName": "", "role": "student"}), 400, "validation/failed"),
    ];

    for (payload, status, code) in cases {
        let response = app
            .client
            .post(app.url("/api/auth/register"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), status, "payload: {}", payload);
        let body: Value = response.json().await.unwrap();
        assert_eq!(error_code(&body), code);
    }
}

#[tokio::test]
async fn concurrent_registrations_claim_an_email_once() {
    let app = spawn_app().await;
    let signup = |name: &str| {
        app.client
            .post(app.url("/api/auth/register"))
            .json(&json!({
                "email": "twin@example.com",
                "password": "password123",
                "displayName": name,
                "role": "student"
            }))
            .send()
    };

    let (first, second) = tokio::join!(signup("First"), signup("Second"));
    let mut statuses = vec![
        first.unwrap().status().as_u16(),
        second.unwrap().status().as_u16(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec![201, 409]);

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({"email": "twin@example.com", "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let session: Value = response.json().await.unwrap();

    let profile: Value = app
        .get("/api/profile", session["token"].as_str().unwrap())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(profile["id"], session["userId"]);
    assert_eq!(profile["email"], "twin@example.com");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/dashboard")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "auth/missing-token");

    let response = app.get("/api/dashboard", "garbage.token.value").await;
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "auth/invalid-token");
}

#[tokio::test]
async fn students_cannot_author_quizzes() {
    let app = spawn_app().await;
    let student = app.register("student", "Sam").await;

    let response = app.post_json("/api/quizzes", &student.token, &math_quiz(true)).await;

    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "auth/insufficient-role");
}

#[tokio::test]
async fn invalid_quizzes_are_rejected() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;

    let mut blank_title = math_quiz(false);
    blank_title["title"] = json!("   ");
    let mut no_questions = math_quiz(false);
    no_questions["questions"] = json!([]);

    for payload in [blank_title, no_questions] {
        let response = app.post_json("/api/quizzes", &teacher.token, &payload).await;
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(error_code(&body), "validation/failed");
    }

    // Nothing was stored.
    let mine: Vec<Value> = app
        .get("/api/quizzes/mine", &teacher.token)
        .await
        .json()
        .await
        .unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn saved_quiz_round_trips() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;

    let payload = json!({
        "title": "Capitals: Q&A",
        "description": "Europe's capitals, 1 < 2 & 3 > 2",
        "questions": [
            {
                "id": "q1",
                "type": "multiple-choice",
                "text": "Capital of France?",
                "options": [{"id": "a", "text": "Paris"}, {"id": "b", "text": "Lyon"}],
                "correctAnswer": ["a"],
                "points": 2
            },
            {
                "id": "q2",
                "type": "short-answer",
                "text": "Capital of Italy?",
                "correctAnswer": ["Rome"]
            }
        ],
        "timeLimit": 15
    });

    let response = app.post_json("/api/quizzes", &teacher.token, &payload).await;
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_str().unwrap();

    let fetched: Value = app
        .get(&format!("/api/quizzes/{}", id), &teacher.token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(fetched["title"], "Capitals: Q&A");
    assert_eq!(fetched["description"], "Europe's capitals, 1 < 2 & 3 > 2");
    assert_eq!(fetched["timeLimit"], 15);
    assert_eq!(fetched["authorId"], teacher.user_id.as_str());
    let questions = fetched["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["id"], "q1");
    assert_eq!(questions[1]["id"], "q2");
    assert_eq!(questions[1]["points"], 1);
}

#[tokio::test]
async fn math_quiz_scores_all_or_nothing() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    for (answer, expected) in [("o1", 100.0), ("o2", 0.0)] {
        let student = app.register("student", "Sam").await;
        let response = app
            .post_json(
                &format!("/api/quizzes/{}/submissions", quiz_id),
                &student.token,
                &json!({"answers": {"q1": [answer]}, "timeSpent": 42}),
            )
            .await;

        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["score"].as_f64(), Some(expected));
        assert_eq!(body["totalPoints"], 10);
        assert_eq!(body["timeSpent"], 42);
        assert_eq!(body["autoSubmitted"], false);
    }

    let quiz: Value = app
        .get(&format!("/api/quizzes/{}", quiz_id), &teacher.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["submissionCount"], 2);
}

#[tokio::test]
async fn other_teachers_cannot_edit() {
    let app = spawn_app().await;
    let owner = app.register("teacher", "Ada").await;
    let other = app.register("teacher", "Grace").await;
    let quiz_id = app.create_math_quiz(&owner.token, true).await;
    let path = format!("/api/quizzes/{}", quiz_id);

    let response = app.get(&path, &other.token).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "quiz/not-owner");
    assert!(body.get("questions").is_none());

    let response = app.put_json(&path, &other.token, &math_quiz(false)).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app.client.delete(app.url(&path)).bearer_auth(&other.token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app.get(&format!("{}/results", path), &other.token).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn update_keeps_author_and_counter() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    app.post_json(
        &format!("/api/quizzes/{}/submissions", quiz_id),
        &student.token,
        &json!({"answers": {"q1": ["o1"]}}),
    )
    .await;

    let mut edited = math_quiz(true);
    edited["title"] = json!("Math, revised");
    let response = app
        .put_json(&format!("/api/quizzes/{}", quiz_id), &teacher.token, &edited)
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Math, revised");
    assert_eq!(body["submissionCount"], 1);
    assert_eq!(body["authorId"], teacher.user_id.as_str());
}

#[tokio::test]
async fn drafts_cannot_be_taken_by_students() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, false).await;

    let response = app.get(&format!("/api/quizzes/{}/take", quiz_id), &student.token).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "quiz/not-published");

    let response = app
        .post_json(
            &format!("/api/quizzes/{}/submissions", quiz_id),
            &student.token,
            &json!({"answers": {"q1": ["o1"]}}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    // The owner can preview a draft.
    let response = app.get(&format!("/api/quizzes/{}/take", quiz_id), &teacher.token).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn taking_view_hides_answers() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    let body: Value = app
        .get(&format!("/api/quizzes/{}/take", quiz_id), &student.token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["totalPoints"], 10);
    let question = &body["questions"][0];
    assert_eq!(question["options"].as_array().unwrap().len(), 2);
    assert!(question.get("correctAnswer").is_none());
    assert!(question.get("explanation").is_none());
}

#[tokio::test]
async fn sharing_controls_public_catalogue() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let quiz_id = app.create_math_quiz(&teacher.token, false).await;

    let public: Vec<Value> = app
        .client
        .get(app.url("/api/quizzes/public"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(public.is_empty());

    let response = app
        .put_json(
            &format!("/api/quizzes/{}/sharing", quiz_id),
            &teacher.token,
            &json!({"isPublished": true, "isPublic": true}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let public: Vec<Value> = app
        .client
        .get(app.url("/api/quizzes/public?category=math"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0]["id"], quiz_id.as_str());
    assert_eq!(public[0]["questionCount"], 1);
}

#[tokio::test]
async fn my_quizzes_filter_by_status() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let published = app.create_math_quiz(&teacher.token, true).await;
    let draft = app.create_math_quiz(&teacher.token, false).await;

    let drafts: Vec<Value> = app
        .get("/api/quizzes/mine?status=draft", &teacher.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["id"], draft.as_str());

    let all: Vec<Value> = app
        .get("/api/quizzes/mine?sort=oldest", &teacher.token)
        .await
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|q| q["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![published.as_str(), draft.as_str()]);
}

#[tokio::test]
async fn answer_key_unlocks_after_submission() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;
    let key_path = format!("/api/quizzes/{}/answer-key", quiz_id);

    let response = app.get(&key_path, &student.token).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "quiz/answer-key-locked");

    app.post_json(
        &format!("/api/quizzes/{}/submissions", quiz_id),
        &student.token,
        &json!({"answers": {"q1": ["o2"]}}),
    )
    .await;

    let key: Value = app.get(&key_path, &student.token).await.json().await.unwrap();
    assert_eq!(key["entries"][0]["correctAnswer"], json!(["o1"]));
    assert_eq!(key["entries"][0]["correctAnswerText"], json!(["True"]));

    let response = app.get(&key_path, &teacher.token).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn results_include_stats_for_owner() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    for answer in ["o1", "o1", "o2", "o1"] {
        let student = app.register("student", "Sam").await;
        app.post_json(
            &format!("/api/quizzes/{}/submissions", quiz_id),
            &student.token,
            &json!({"answers": {"q1": [answer]}, "timeSpent": 60}),
        )
        .await;
    }

    let results: Value = app
        .get(&format!("/api/quizzes/{}/results", quiz_id), &teacher.token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(results["submissions"].as_array().unwrap().len(), 4);
    let stats = &results["stats"];
    assert_eq!(stats["submissionCount"], 4);
    assert_eq!(stats["averageScore"].as_f64(), Some(75.0));
    assert_eq!(stats["highestScore"].as_f64(), Some(100.0));
    assert_eq!(stats["lowestScore"].as_f64(), Some(0.0));
    assert_eq!(stats["averageTimeSpent"].as_f64(), Some(60.0));
    assert_eq!(stats["distribution"][0]["count"], 1);
    assert_eq!(stats["distribution"][4]["count"], 3);
    assert_eq!(stats["questions"][0]["correctRate"].as_f64(), Some(75.0));
}

#[tokio::test]
async fn submissions_are_private_to_submitter_and_author() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let stranger = app.register("student", "Eve").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    let submission: Value = app
        .post_json(
            &format!("/api/quizzes/{}/submissions", quiz_id),
            &student.token,
            &json!({"answers": {"q1": ["o1"]}}),
        )
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/submissions/{}", submission["id"].as_str().unwrap());

    assert_eq!(app.get(&path, &student.token).await.status().as_u16(), 200);
    assert_eq!(app.get(&path, &teacher.token).await.status().as_u16(), 200);

    let response = app.get(&path, &stranger.token).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "submission/not-owner");

    let mine: Vec<Value> = app
        .get("/api/submissions/mine", &student.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["quizTitle"], "Math");
}

#[tokio::test]
async fn deleted_quiz_is_gone() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;
    let path = format!("/api/quizzes/{}", quiz_id);

    let response = app.client.delete(app.url(&path)).bearer_auth(&teacher.token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = app.get(&path, &teacher.token).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn dashboard_collects_all_listings() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;
    app.create_math_quiz(&teacher.token, false).await;

    app.post_json(
        &format!("/api/quizzes/{}/submissions", quiz_id),
        &student.token,
        &json!({"answers": {"q1": ["o1"]}}),
    )
    .await;

    let teacher_view: Value = app.get("/api/dashboard", &teacher.token).await.json().await.unwrap();
    assert_eq!(teacher_view["myQuizzes"].as_array().unwrap().len(), 2);
    assert_eq!(teacher_view["publicQuizzes"].as_array().unwrap().len(), 1);
    assert!(teacher_view["warnings"].as_array().unwrap().is_empty());

    let student_view: Value = app.get("/api/dashboard", &student.token).await.json().await.unwrap();
    assert!(student_view["myQuizzes"].as_array().unwrap().is_empty());
    assert_eq!(student_view["mySubmissions"].as_array().unwrap().len(), 1);
    assert_eq!(student_view["mySubmissions"][0]["score"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn attempt_submits_saved_answers_once() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    let response = app
        .post_json(&format!("/api/quizzes/{}/attempts", quiz_id), &student.token, &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let attempt: Value = response.json().await.unwrap();
    let attempt_id = attempt["attemptId"].as_str().unwrap();
    assert!(attempt["deadline"].is_null());

    let status: Value = app
        .put_json(
            &format!("/api/attempts/{}/answers", attempt_id),
            &student.token,
            &json!({"answers": {"q1": ["o1"]}}),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(status["answered"], 1);

    // Someone else cannot see or submit it.
    let intruder = app.register("student", "Eve").await;
    let response = app.get(&format!("/api/attempts/{}", attempt_id), &intruder.token).await;
    assert_eq!(response.status().as_u16(), 403);

    let submit_path = format!("/api/attempts/{}/submit", attempt_id);
    let response = app.post_json(&submit_path, &student.token, &json!({})).await;
    assert_eq!(response.status().as_u16(), 201);
    let submission: Value = response.json().await.unwrap();
    assert_eq!(submission["score"].as_f64(), Some(100.0));

    let response = app.post_json(&submit_path, &student.token, &json!({})).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn timed_attempt_reports_deadline() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;

    let mut timed = math_quiz(true);
    timed["timeLimit"] = json!(5);
    let created: Value = app.post_json("/api/quizzes", &teacher.token, &timed).await.json().await.unwrap();

    let attempt: Value = app
        .post_json(
            &format!("/api/quizzes/{}/attempts", created["id"].as_str().unwrap()),
            &student.token,
            &json!({}),
        )
        .await
        .json()
        .await
        .unwrap();

    let remaining = attempt["remainingSeconds"].as_u64().unwrap();
    assert!(remaining > 290 && remaining <= 300, "remaining: {}", remaining);

    let response = app
        .client
        .delete(app.url(&format!("/api/attempts/{}", attempt["attemptId"].as_str().unwrap())))
        .bearer_auth(&student.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
}

#[tokio::test]
async fn attempt_on_unpublished_quiz_cannot_be_submitted() {
    let app = spawn_app().await;
    let teacher = app.register("teacher", "Ada").await;
    let student = app.register("student", "Sam").await;
    let quiz_id = app.create_math_quiz(&teacher.token, true).await;

    let attempt: Value = app
        .post_json(&format!("/api/quizzes/{}/attempts", quiz_id), &student.token, &json!({}))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .put_json(
            &format!("/api/quizzes/{}/sharing", quiz_id),
            &teacher.token,
            &json!({"isPublished": false}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let submit_path = format!("/api/attempts/{}/submit", attempt["attemptId"].as_str().unwrap());
    let response = app.post_json(&submit_path, &student.token, &json!({})).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_code(&body), "quiz/not-published");

    let results = app.get(&format!("/api/quizzes/{}/results", quiz_id), &teacher.token).await;
    let results: Value = results.json().await.unwrap();
    assert!(results["submissions"].as_array().unwrap().is_empty());
}
