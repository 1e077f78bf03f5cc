use std::error::Error as StdError;

use tracing::debug;

use super::PostProcess;
use crate::{
    client::{ClientError, ComputationApi},
    error::Error,
    models::{Computation, Content, ResultEntity},
};

/// Client-side decryption of end-to-end encrypted results. The decryption
/// itself is performed by the caller's key material, outside of this crate.
pub trait Decryptor {
    fn decrypt(
        &mut self,
        contents: Vec<Content>,
    ) -> Result<Content, Box<dyn StdError + Send + Sync>>;
}

/// Which post-processing hook produced the value.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed<T> {
    Plaintext(T),
    Encrypted(Vec<Content>),
}

/// A post-processed result, along with the contents it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResult<T> {
    /// Contents before post-processing, after decryption.
    pub raw: Vec<Content>,
    pub value: Routed<T>,
}

/// Fetches the results of a finished computation and hands them to the
/// plaintext or the encrypted hook of a [`PostProcess`].
pub struct ResultRouter<P> {
    hook: P,
    decryptor: Option<Box<dyn Decryptor + Send>>,
}

impl<P> ResultRouter<P>
where
    P: PostProcess,
{
    pub fn new(hook: P) -> Self {
        Self {
            hook,
            decryptor: None,
        }
    }

    /// Set the decryptor used for end-to-end encrypted results.
    pub fn with_decryptor<D>(mut self, decryptor: D) -> Self
    where
        D: Decryptor + Send + 'static,
    {
        self.decryptor = Some(Box::new(decryptor));
        self
    }

    /// Fetch, decrypt if needed and post-process the results of
    /// `computation`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingResults`] if the computation has no content.
    /// - [`Error::MissingDecryptor`] or [`Error::Decryption`] if the result is
    ///   end-to-end encrypted and cannot be decrypted.
    /// - [`Error::Protocol`] if fetching failed.
    /// - any error of the hook.
    pub async fn route<A>(
        &mut self,
        api: &mut A,
        computation: &Computation,
    ) -> Result<RoutedResult<P::Output>, Error>
    where
        A: ComputationApi,
    {
        let contents = self.fetch(api, computation).await?;
        let first_encrypted = match contents.first() {
            Some(content) => content.is_encrypted(),
            None => return Err(Error::MissingResults(computation.id.clone())),
        };

        let raw = contents.clone();
        let value = if first_encrypted {
            debug!("results of computation {} are encrypted", computation.id);
            Routed::Encrypted(self.hook.encrypted(contents)?)
        } else {
            Routed::Plaintext(self.hook.plaintext(contents)?)
        };
        Ok(RoutedResult { raw, value })
    }

    async fn fetch<A>(&mut self, api: &mut A, computation: &Computation) -> Result<Vec<Content>, Error>
    where
        A: ComputationApi,
    {
        match &computation.result_id {
            Some(result_id) => {
                let result = api.get_result(result_id).await?;
                let content = fetch_result_content(api, &result).await?;
                if result.is_end_to_end_encrypted() {
                    Ok(vec![self.decrypt(&result, content)?])
                } else {
                    Ok(vec![content])
                }
            }
            None => {
                debug!(
                    "computation {} has no result, fetching its {} data objects",
                    computation.id,
                    computation.results.len()
                );
                let mut contents = Vec::with_capacity(computation.results.len());
                for id in &computation.results {
                    let object = api.get_data_object(id).await?;
                    debug!("data object {} is a {:?}", object.id, object.object_type);
                    contents.push(api.get_data_object_content(&object.id).await?);
                }
                Ok(contents)
            }
        }
    }

    fn decrypt(&mut self, result: &ResultEntity, content: Content) -> Result<Content, Error> {
        let decryptor = self
            .decryptor
            .as_mut()
            .ok_or_else(|| Error::MissingDecryptor(result.id.clone()))?;
        debug!("decrypting result {}", result.id);
        decryptor
            .decrypt(vec![content])
            .map_err(|e| Error::Decryption(e.to_string()))
    }
}

async fn fetch_result_content<A>(api: &mut A, result: &ResultEntity) -> Result<Content, Error>
where
    A: ComputationApi,
{
    let data_object_id = result.data_object_id.as_deref().ok_or_else(|| {
        ClientError::Deserialize(format!("result {} has no data object", result.id))
    })?;
    Ok(api.get_data_object_content(data_object_id).await?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        client::MockComputationApi,
        models::{DataObject, EncryptedContent, FloatMatrix},
        router::{Identity, Scalar},
    };

    struct XorDecryptor(u8);

    impl Decryptor for XorDecryptor {
        fn decrypt(
            &mut self,
            contents: Vec<Content>,
        ) -> Result<Content, Box<dyn StdError + Send + Sync>> {
            let encrypted = match contents.into_iter().next() {
                Some(Content::EncryptedContent(encrypted)) => encrypted,
                other => return Err(format!("cannot decrypt {:?}", other).into()),
            };
            let plaintext: Vec<u8> = encrypted.bytes()?.iter().map(|b| b ^ self.0).collect();
            Ok(serde_json::from_slice(&plaintext)?)
        }
    }

    fn float_matrix(value: f64) -> Content {
        Content::FloatMatrix(FloatMatrix {
            columns: vec!["value".into()],
            data: vec![vec![value]],
        })
    }

    fn computation(value: serde_json::Value) -> Computation {
        serde_json::from_value(value).unwrap()
    }

    fn result(encrypted: bool) -> ResultEntity {
        serde_json::from_value(json!({
            "id": "r-1",
            "dataObjectId": "do-r",
            "endToEndEncrypted": encrypted,
        }))
        .unwrap()
    }

    fn data_object(id: &str) -> DataObject {
        serde_json::from_value(json!({"id": id, "type": "floatMatrix"})).unwrap()
    }

    #[tokio::test]
    async fn test_route_result() {
        let mut api = MockComputationApi::new();
        api.expect_get_result()
            .withf(|id| id == "r-1")
            .times(1)
            .returning(|_| Ok(result(false)));
        api.expect_get_data_object_content()
            .withf(|id| id == "do-r")
            .times(1)
            .returning(|_| Ok(float_matrix(3.5)));
        api.expect_get_data_object().never();

        let computation = computation(json!({
            "id": "c-1",
            "status": "success",
            "results": ["do-1"],
            "resultId": "r-1",
        }));
        let routed = ResultRouter::new(Scalar)
            .route(&mut api, &computation)
            .await
            .unwrap();
        assert_eq!(routed.value, Routed::Plaintext(3.5));
        assert_eq!(routed.raw, vec![float_matrix(3.5)]);
    }

    #[tokio::test]
    async fn test_route_data_objects_without_result() {
        let mut api = MockComputationApi::new();
        api.expect_get_result().never();
        api.expect_get_data_object()
            .times(2)
            .returning(|id| Ok(data_object(id)));
        api.expect_get_data_object_content()
            .times(2)
            .returning(|id| Ok(float_matrix(if id == "do-1" { 1.0 } else { 2.0 })));

        let computation = computation(json!({
            "id": "c-1",
            "status": "success",
            "results": ["do-1", "do-2"],
        }));
        let routed = ResultRouter::new(Identity)
            .route(&mut api, &computation)
            .await
            .unwrap();
        assert_eq!(
            routed.value,
            Routed::Plaintext(vec![float_matrix(1.0), float_matrix(2.0)])
        );
    }

    #[tokio::test]
    async fn test_route_encrypted_contents() {
        let mut api = MockComputationApi::new();
        api.expect_get_data_object()
            .times(1)
            .returning(|id| Ok(data_object(id)));
        api.expect_get_data_object_content()
            .times(1)
            .returning(|_| Ok(Content::Ciphertable(EncryptedContent::from_bytes(b"ct"))));

        let computation = computation(json!({
            "id": "c-1",
            "status": "success",
            "results": ["do-1"],
        }));
        let routed = ResultRouter::new(Scalar)
            .route(&mut api, &computation)
            .await
            .unwrap();
        assert_eq!(
            routed.value,
            Routed::Encrypted(vec![Content::Ciphertable(EncryptedContent::from_bytes(
                b"ct"
            ))])
        );
    }

    #[tokio::test]
    async fn test_route_end_to_end_encrypted_result() {
        let plaintext = serde_json::to_vec(&float_matrix(7.0)).unwrap();
        let ciphertext: Vec<u8> = plaintext.iter().map(|b| b ^ 42).collect();

        let mut api = MockComputationApi::new();
        api.expect_get_result()
            .times(2)
            .returning(|_| Ok(result(true)));
        api.expect_get_data_object_content()
            .times(2)
            .returning(move |_| Ok(Content::EncryptedContent(EncryptedContent::from_bytes(&ciphertext))));

        let computation = computation(json!({
            "id": "c-1",
            "status": "success",
            "results": ["do-1"],
            "resultId": "r-1",
        }));

        let missing = ResultRouter::new(Scalar).route(&mut api, &computation).await;
        assert!(matches!(missing, Err(Error::MissingDecryptor(id)) if id == "r-1"));

        let routed = ResultRouter::new(Scalar)
            .with_decryptor(XorDecryptor(42))
            .route(&mut api, &computation)
            .await
            .unwrap();
        assert_eq!(routed.value, Routed::Plaintext(7.0));
        assert_eq!(routed.raw, vec![float_matrix(7.0)]);
    }

    #[tokio::test]
    async fn test_route_without_contents() {
        let mut api = MockComputationApi::new();
        let computation = computation(json!({"id": "c-1", "status": "success"}));
        assert!(matches!(
            ResultRouter::new(Identity).route(&mut api, &computation).await,
            Err(Error::MissingResults(_))
        ));
    }

    #[tokio::test]
    async fn test_result_without_data_object() {
        let mut api = MockComputationApi::new();
        api.expect_get_result()
            .returning(|_| Ok(serde_json::from_value(json!({"id": "r-1"})).unwrap()));
        let computation = computation(json!({
            "id": "c-1",
            "status": "success",
            "results": ["do-1"],
            "resultId": "r-1",
        }));
        assert!(matches!(
            ResultRouter::new(Identity).route(&mut api, &computation).await,
            Err(Error::Protocol(ClientError::Deserialize(_)))
        ));
    }
}
