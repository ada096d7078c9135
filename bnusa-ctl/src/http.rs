use async_trait::async_trait;
use bnusa_api::{
    Ack, Comment, CommentApi, CommentId, Created, DeleteContext, Error, NewComment, Page,
    PageRequest, Target,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

const MAX_RETRIES: u32 = 3;

/// `CommentApi` over the bnusa REST endpoints
pub struct HttpApi {
    host: String,
    token: Option<String>,
    client: ClientWithMiddleware,
}

fn network(err: impl std::fmt::Display) -> Error {
    Error::Network(err.to_string())
}

impl HttpApi {
    pub fn new(host: String, token: Option<String>) -> HttpApi {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        HttpApi {
            host: String::from(host.trim_end_matches('/')),
            token,
            client,
        }
    }

    fn url(&self, target: &Target, rest: &str) -> String {
        format!("{}{}{}", self.host, target.base_path(), rest)
    }

    async fn send<R>(&self, req: RequestBuilder) -> Result<R, Error>
    where
        R: serde::de::DeserializeOwned,
    {
        let req = match &self.token {
            Some(tok) => req.bearer_auth(tok),
            None => req,
        };
        let resp = req.send().await.map_err(network)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(network)?;
        if !status.is_success() {
            tracing::debug!(%status, "request failed");
            return Err(Error::from_response(status, &body));
        }
        serde_json::from_slice(&body)
            .map_err(|e| Error::Unknown(format!("parsing response from server: {e}")))
    }
}

#[async_trait]
impl CommentApi for HttpApi {
    async fn fetch_comments(
        &self,
        target: &Target,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        let url = self.url(target, &format!("/{}", target.entity_id()));
        let resp: Page<Comment> = self.send(self.client.get(url).query(&page)).await?;
        resp.into_result()
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        let url = self.url(target, &format!("/replies/{parent}"));
        let resp: Page<Comment> = self.send(self.client.get(url).query(&page)).await?;
        resp.into_result()
    }

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, Error> {
        new.validate()?;
        let body = serde_json::to_vec(new)
            .map_err(|e| Error::Unknown(format!("serializing comment: {e}")))?;
        let req = self
            .client
            .post(self.url(&new.target, ""))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let resp: Created = self.send(req).await?;
        resp.into_result()
    }

    async fn delete_comment(
        &self,
        target: &Target,
        id: &CommentId,
        ctx: &DeleteContext,
    ) -> Result<(), Error> {
        let url = self.url(target, &format!("/{id}"));
        let resp: Ack = self.send(self.client.delete(url).query(ctx)).await?;
        resp.into_result()
    }
}
