use thiserror::Error;

/// レポート生成1回分で発生するエラー。
///
/// 呼び出し側(CLI)は`kind()`でエラー種別を判定し、終了コードやメッセージに変換する。
#[derive(Debug, Error)]
pub enum ReportError {
    /// リクエストの値が不正、またはリクエストを解釈できない。
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Toggl APIへの接続失敗、または成功以外のステータスが返った。
    #[error("Toggl API is unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Toggl APIのレスポンスを解釈できない。
    #[error("Malformed response from Toggl API: {0}")]
    UpstreamMalformed(String),

    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("Report generation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// 境界側に見せるエラーの分類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    BadGateway,
    Cancelled,
    Internal,
}

impl ReportError {
    /// エラーの分類を返す。
    ///
    /// レスポンスの解釈失敗は、呼び出し側が渡した値が原因であることが多いため`BadRequest`として扱う。
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::InvalidRequest(_) | ReportError::UpstreamMalformed(_) => {
                ErrorKind::BadRequest
            }
            ReportError::UpstreamUnavailable(_) => ErrorKind::BadGateway,
            ReportError::Cancelled => ErrorKind::Cancelled,
            ReportError::Render(_) | ReportError::Unexpected(_) => ErrorKind::Internal,
        }
    }

    /// 利用者に表示してよいメッセージを返す。
    ///
    /// 内部エラーの詳細はログにのみ出力し、ここには含めない。
    pub fn public_message(&self) -> String {
        match self {
            ReportError::InvalidRequest(message) => message.clone(),
            ReportError::UpstreamMalformed(_) => {
                "Unexpected response from Toggl API. Please check the request parameters.".to_string()
            }
            ReportError::UpstreamUnavailable(_) => {
                "Error accessing Toggl API. Please check your API token and try again.".to_string()
            }
            ReportError::Cancelled => "Report generation was cancelled".to_string(),
            ReportError::Render(_) | ReportError::Unexpected(_) => {
                "An unexpected error occurred while generating the report".to_string()
            }
        }
    }
}

impl ErrorKind {
    /// CLIの終了コードを返す。
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::BadRequest => 2,
            ErrorKind::BadGateway => 3,
            ErrorKind::Cancelled => 130,
            ErrorKind::Internal => 1,
        }
    }
}

/// 設定の読み込みやクライアント構築時に発生するエラー。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOGGL_API_TOKEN must be set")]
    MissingApiToken,

    #[error("Failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
