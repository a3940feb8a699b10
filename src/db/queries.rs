pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS alerts (
    id SERIAL PRIMARY KEY,
    lat DOUBLE PRECISION NOT NULL CHECK (lat BETWEEN -90 AND 90),
    lon DOUBLE PRECISION NOT NULL CHECK (lon BETWEEN -180 AND 180),
    parameter TEXT NOT NULL,
    operator TEXT NOT NULL CHECK (operator IN ('>', '<', '>=', '<=', '=')),
    threshold DOUBLE PRECISION NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_alerts_location ON alerts (lat, lon);
"#,
    r#"
CREATE TABLE IF NOT EXISTS alert_status (
    id BIGSERIAL PRIMARY KEY,
    alert_id INTEGER NOT NULL REFERENCES alerts (id) ON DELETE CASCADE,
    is_triggered BOOLEAN NOT NULL DEFAULT FALSE,
    current_value DOUBLE PRECISION,
    checked_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_alert_status_latest ON alert_status (alert_id, checked_at DESC, id DESC);
"#,
];

pub const PING: &str = r#"
SELECT 1;
"#;

// Held for the duration of a create so concurrent creates see each other's rows.
// SHARE ROW EXCLUSIVE conflicts with itself but not with plain reads.
pub const LOCK_ALERTS_FOR_CREATE: &str = r#"
LOCK TABLE alerts IN SHARE ROW EXCLUSIVE MODE;
"#;

pub const COUNT_ALERTS: &str = r#"
SELECT COUNT(*) FROM alerts;
"#;

pub const INSERT_ALERT: &str = r#"
INSERT INTO alerts (lat, lon, parameter, operator, threshold, description)
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING id, lat, lon, parameter, operator, threshold, description, created_at;
"#;

pub const SELECT_ALERTS: &str = r#"
SELECT id, lat, lon, parameter, operator, threshold, description, created_at
FROM alerts
ORDER BY created_at DESC, id DESC;
"#;

pub const SELECT_ALERTS_WITH_LATEST_STATUS: &str = r#"
SELECT a.id, a.lat, a.lon, a.parameter, a.operator, a.threshold, a.description, a.created_at,
       s.is_triggered, s.current_value, s.checked_at
FROM alerts a
LEFT JOIN LATERAL (
    SELECT is_triggered, current_value, checked_at
    FROM alert_status
    WHERE alert_id = a.id
    ORDER BY checked_at DESC, id DESC
    LIMIT 1
) s ON TRUE
ORDER BY a.created_at DESC, a.id DESC;
"#;

pub const SELECT_TRIGGERED_ALERTS: &str = r#"
SELECT a.id, a.lat, a.lon, a.parameter, a.operator, a.threshold, a.description, a.created_at,
       s.is_triggered, s.current_value, s.checked_at
FROM alerts a
JOIN LATERAL (
    SELECT is_triggered, current_value, checked_at
    FROM alert_status
    WHERE alert_id = a.id
    ORDER BY checked_at DESC, id DESC
    LIMIT 1
) s ON TRUE
WHERE s.is_triggered
ORDER BY s.checked_at DESC, a.id DESC;
"#;

pub const DELETE_ALERT: &str = r#"
DELETE FROM alerts
WHERE id = $1
RETURNING id, lat, lon, parameter, operator, threshold, description, created_at;
"#;

pub const INSERT_ALERT_STATUS: &str = r#"
INSERT INTO alert_status (alert_id, is_triggered, checked_at, current_value)
SELECT $1::INTEGER, $2::BOOLEAN, $3::TIMESTAMPTZ, $4::DOUBLE PRECISION
WHERE EXISTS (SELECT 1 FROM alerts WHERE id = $1::INTEGER)
RETURNING id, alert_id, is_triggered, current_value, checked_at;
"#;
